//! Query state: the mutable accumulator a caller fills before compiling.
//!
//! Lists keep insertion order. Conditions are ANDed in the order they were
//! added; reordering changes the emitted text, never the meaning.

use crate::error::CompileError;
use crate::exists::RelationExists;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Operators
// ============================================================================

/// Comparison operator of a [`Condition::Basic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// SQL-style LIKE; translated according to the configured `LikeMode`
    Like,
    NotLike,
    StartsWith,
    EndsWith,
    Contains,
    /// Regular expression match (`=~`)
    Regex,
}

impl Operator {
    /// Target-language text for operators that map one to one.
    ///
    /// `Like`/`NotLike` have no fixed text; the clause builder resolves them.
    pub fn cypher(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Like | Operator::Contains => "CONTAINS",
            Operator::NotLike => "NOT CONTAINS",
            Operator::StartsWith => "STARTS WITH",
            Operator::EndsWith => "ENDS WITH",
            Operator::Regex => "=~",
        }
    }

    /// True for the six ordering/equality comparisons.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Eq
                | Operator::NotEq
                | Operator::Lt
                | Operator::Lte
                | Operator::Gt
                | Operator::Gte
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Operator::Like => "like",
            Operator::NotLike => "not like",
            other => other.cypher(),
        };
        f.write_str(text)
    }
}

impl FromStr for Operator {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        Ok(match normalized.as_str() {
            "=" | "==" => Operator::Eq,
            "!=" | "<>" => Operator::NotEq,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "like" => Operator::Like,
            "not like" => Operator::NotLike,
            "starts with" => Operator::StartsWith,
            "ends with" => Operator::EndsWith,
            "contains" => Operator::Contains,
            "=~" | "regexp" => Operator::Regex,
            _ => return Err(CompileError::UnknownOperator(s.to_string())),
        })
    }
}

// ============================================================================
// Conditions
// ============================================================================

/// A single filter. Used for both WHERE and HAVING lists.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Basic {
        column: String,
        operator: Operator,
        value: Value,
    },
    In {
        column: String,
        values: Vec<Value>,
    },
    NotIn {
        column: String,
        values: Vec<Value>,
    },
    Null {
        column: String,
    },
    NotNull {
        column: String,
    },
    Between {
        column: String,
        low: Value,
        high: Value,
    },
    /// Emitted verbatim; the caller owns its correctness
    Raw {
        text: String,
    },
    /// Parenthesized OR group
    Any(Vec<Condition>),
    /// Relation existence / count predicate
    Exists(RelationExists),
}

impl Condition {
    pub fn basic(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Condition::Basic {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Condition::Raw { text: text.into() }
    }

    /// Column the condition filters on, if it has exactly one.
    pub fn column(&self) -> Option<&str> {
        match self {
            Condition::Basic { column, .. }
            | Condition::In { column, .. }
            | Condition::NotIn { column, .. }
            | Condition::Null { column }
            | Condition::NotNull { column }
            | Condition::Between { column, .. } => Some(column),
            Condition::Raw { .. } | Condition::Any(_) | Condition::Exists(_) => None,
        }
    }

    /// Copy of the condition with its column replaced.
    pub(crate) fn with_column(&self, new_column: String) -> Self {
        let mut cloned = self.clone();
        match &mut cloned {
            Condition::Basic { column, .. }
            | Condition::In { column, .. }
            | Condition::NotIn { column, .. }
            | Condition::Null { column }
            | Condition::NotNull { column }
            | Condition::Between { column, .. } => *column = new_column,
            Condition::Raw { .. } | Condition::Any(_) | Condition::Exists(_) => {}
        }
        cloned
    }
}

// ============================================================================
// Columns, ordering, joins
// ============================================================================

/// A requested output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    /// `*`: the node itself, already returned first
    All,
    /// Property name, optionally qualified (`title`, `u.name`, `users.name`)
    Name(String),
    /// Free text, possibly several comma-separated items with `AS` aliases
    Raw(String),
}

impl From<&str> for Column {
    fn from(s: &str) -> Self {
        if s.trim() == "*" {
            Column::All
        } else {
            Column::Name(s.to_string())
        }
    }
}

impl From<String> for Column {
    fn from(s: String) -> Self {
        Column::from(s.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn keyword(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Direction::Asc),
            "desc" | "descending" => Ok(Direction::Desc),
            _ => Err(CompileError::UnknownOperator(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    Column { column: String, direction: Direction },
    Raw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Cross,
}

/// `first <operator> second`, both column references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOn {
    pub first: String,
    pub operator: Operator,
    pub second: String,
}

/// Another label to pattern-match alongside the primary target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub label: String,
    pub alias: String,
    pub on: Option<JoinOn>,
    pub kind: JoinKind,
}

impl Join {
    pub fn inner(
        label: impl Into<String>,
        alias: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::on_kind(JoinKind::Inner, label, alias, first, second)
    }

    pub fn left(
        label: impl Into<String>,
        alias: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::on_kind(JoinKind::Left, label, alias, first, second)
    }

    pub fn cross(label: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            alias: alias.into(),
            on: None,
            kind: JoinKind::Cross,
        }
    }

    fn on_kind(
        kind: JoinKind,
        label: impl Into<String>,
        alias: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            alias: alias.into(),
            on: Some(JoinOn {
                first: first.into(),
                operator: Operator::Eq,
                second: second.into(),
            }),
            kind,
        }
    }
}

/// Primary label and its alias. `alias: None` takes the configured default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchTarget {
    pub label: String,
    pub alias: Option<String>,
}

// ============================================================================
// QueryState
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub target: MatchTarget,
    pub wheres: Vec<Condition>,
    pub joins: Vec<Join>,
    pub groups: Vec<String>,
    pub havings: Vec<Condition>,
    pub orders: Vec<Order>,
    pub columns: Vec<Column>,
    pub distinct: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QueryState {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            target: MatchTarget {
                label: label.into(),
                alias: None,
            },
            wheres: Vec::new(),
            joins: Vec::new(),
            groups: Vec::new(),
            havings: Vec::new(),
            orders: Vec::new(),
            columns: Vec::new(),
            distinct: false,
            limit: None,
            offset: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.target.alias = Some(alias.into());
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.wheres.push(condition);
        self
    }

    pub fn where_basic(
        self,
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        self.filter(Condition::basic(column, operator, value))
    }

    pub fn where_in(self, column: impl Into<String>, values: Vec<Value>) -> Self {
        self.filter(Condition::In {
            column: column.into(),
            values,
        })
    }

    pub fn where_not_in(self, column: impl Into<String>, values: Vec<Value>) -> Self {
        self.filter(Condition::NotIn {
            column: column.into(),
            values,
        })
    }

    pub fn where_null(self, column: impl Into<String>) -> Self {
        self.filter(Condition::Null {
            column: column.into(),
        })
    }

    pub fn where_not_null(self, column: impl Into<String>) -> Self {
        self.filter(Condition::NotNull {
            column: column.into(),
        })
    }

    pub fn where_between(
        self,
        column: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.filter(Condition::Between {
            column: column.into(),
            low: low.into(),
            high: high.into(),
        })
    }

    pub fn where_raw(self, text: impl Into<String>) -> Self {
        self.filter(Condition::raw(text))
    }

    pub fn where_any(self, conditions: Vec<Condition>) -> Self {
        self.filter(Condition::Any(conditions))
    }

    pub fn where_has(self, predicate: RelationExists) -> Self {
        self.filter(Condition::Exists(predicate))
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.groups.push(column.into());
        self
    }

    pub fn having(mut self, condition: Condition) -> Self {
        self.havings.push(condition);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.orders.push(Order::Column {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn order_by_raw(mut self, expression: impl Into<String>) -> Self {
        self.orders.push(Order::Raw(expression.into()));
        self
    }

    pub fn select(mut self, column: impl Into<Column>) -> Self {
        self.columns.push(column.into());
        self
    }

    pub fn select_raw(mut self, expression: impl Into<String>) -> Self {
        self.columns.push(Column::Raw(expression.into()));
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Grouping or post-aggregation filtering is present.
    pub fn needs_aggregation(&self) -> bool {
        !self.groups.is_empty() || !self.havings.is_empty()
    }

    /// Alias of the primary node, falling back to `default`.
    pub fn alias_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.target.alias.as_deref().unwrap_or(default)
    }
}
