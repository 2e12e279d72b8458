//! Execution strategies.
//!
//! A strategy orchestrates the clause builders into a complete query for one
//! [`QueryState`]. Selection is fixed: grouping or HAVING conditions need the
//! aggregation strategy, everything else uses the standard one.

mod aggregate;
mod standard;

pub use aggregate::AggregationStrategy;
pub use standard::StandardStrategy;

use crate::clause::{identity_ref, node_pattern, where_clause, ClauseBuilder, Scope};
use crate::compiled::{Bindings, CompiledQuery};
use crate::error::{CompileError, CompileResult};
use crate::state::{Column, Condition, Join, JoinKind, JoinOn, Order, QueryState};
use cypherbridge_config::CompilerConfig;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

static QUALIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\.").unwrap());

/// Trait for compiling a query state into query text.
pub trait QueryStrategy: Send + Sync {
    /// Unique name for this strategy
    fn name(&self) -> &'static str;

    /// Compile the state. Never mutates it.
    fn compile(&self, state: &QueryState) -> CompileResult<CompiledQuery>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Standard,
    Aggregation,
}

impl StrategyKind {
    pub fn for_state(state: &QueryState) -> Self {
        if state.needs_aggregation() {
            StrategyKind::Aggregation
        } else {
            StrategyKind::Standard
        }
    }
}

/// Picks and builds the strategy for a state.
#[derive(Debug, Clone, Default)]
pub struct StrategyFactory {
    config: CompilerConfig,
}

impl StrategyFactory {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn select(&self, state: &QueryState) -> StrategyKind {
        StrategyKind::for_state(state)
    }

    pub fn create(&self, state: &QueryState) -> Box<dyn QueryStrategy> {
        match self.select(state) {
            StrategyKind::Standard => Box::new(StandardStrategy::new(self.config.clone())),
            StrategyKind::Aggregation => Box::new(AggregationStrategy::new(self.config.clone())),
        }
    }

    pub fn compile(&self, state: &QueryState) -> CompileResult<CompiledQuery> {
        let strategy = self.create(state);
        let compiled = strategy.compile(state)?;
        debug!(
            strategy = strategy.name(),
            params = compiled.bindings().len(),
            "compiled query: {}",
            compiled.cypher()
        );
        Ok(compiled)
    }
}

/// Compile with the default compiler options.
pub fn compile(state: &QueryState) -> CompileResult<CompiledQuery> {
    StrategyFactory::default().compile(state)
}

pub fn compile_with(state: &QueryState, config: &CompilerConfig) -> CompileResult<CompiledQuery> {
    StrategyFactory::new(config.clone()).compile(state)
}

// ============================================================================
// Shared pipeline pieces
// ============================================================================

/// Resolves table-style qualifiers (`users.name`) to pattern aliases (`u.name`).
pub(crate) struct AliasMap<'a> {
    primary: &'a str,
    entries: Vec<(&'a str, &'a str)>,
}

impl<'a> AliasMap<'a> {
    pub(crate) fn new(state: &'a QueryState, primary: &'a str) -> Self {
        let mut entries = vec![(state.target.label.as_str(), primary)];
        entries.extend(state.joins.iter().map(|j| (j.label.as_str(), j.alias.as_str())));
        Self { primary, entries }
    }

    pub(crate) fn primary(&self) -> &'a str {
        self.primary
    }

    /// Alias a qualifier refers to; unknown qualifiers are returned as-is.
    pub(crate) fn alias_for<'q>(&self, qualifier: &'q str) -> &'q str
    where
        'a: 'q,
    {
        if self.entries.iter().any(|(_, alias)| *alias == qualifier) {
            return qualifier;
        }
        self.entries
            .iter()
            .find(|(label, _)| names_label(qualifier, label))
            .map(|(_, alias)| *alias)
            .unwrap_or(qualifier)
    }

    pub(crate) fn resolve(&self, column: &str) -> String {
        match column.split_once('.') {
            Some((qualifier, name)) => format!("{}.{}", self.alias_for(qualifier), name),
            None => column.to_string(),
        }
    }

    /// Column reference usable outside a condition: identity keys become `id(x)`.
    pub(crate) fn reference(&self, column: &str) -> String {
        let resolved = self.resolve(column);
        let (alias, name) = resolved
            .split_once('.')
            .unwrap_or((self.primary, resolved.as_str()));
        if name == "id" {
            identity_ref(name, alias)
        } else {
            format!("{}.{}", alias, name)
        }
    }

    /// Rewrite every `qualifier.` inside free-form text.
    pub(crate) fn resolve_qualifiers(&self, expression: &str) -> String {
        QUALIFIER_RE
            .replace_all(expression, |caps: &Captures<'_>| {
                format!("{}.", self.alias_for(&caps[1]))
            })
            .into_owned()
    }

    pub(crate) fn resolve_condition(&self, condition: &Condition) -> Condition {
        match condition {
            Condition::Any(children) => {
                Condition::Any(children.iter().map(|c| self.resolve_condition(c)).collect())
            }
            other => match other.column() {
                Some(column) => other.with_column(self.resolve(column)),
                None => other.clone(),
            },
        }
    }

    pub(crate) fn resolve_column(&self, column: &Column) -> Column {
        match column {
            Column::Name(name) => Column::Name(self.resolve(name)),
            Column::Raw(expression) => Column::Raw(self.resolve_qualifiers(expression)),
            Column::All => Column::All,
        }
    }

    pub(crate) fn resolve_order(&self, order: &Order) -> Order {
        match order {
            Order::Column { column, direction } => Order::Column {
                column: self.resolve(column),
                direction: *direction,
            },
            Order::Raw(text) => Order::Raw(self.resolve_qualifiers(text)),
        }
    }

    fn join_condition(&self, on: &JoinOn) -> String {
        format!(
            "{} {} {}",
            self.reference(&on.first),
            on.operator.cypher(),
            self.reference(&on.second)
        )
    }
}

/// `User` is named by `user`, `User` or the table-style `users`;
/// `Category` also by `categories`.
fn names_label(qualifier: &str, label: &str) -> bool {
    let lower = qualifier.to_ascii_lowercase();
    let label = label.to_ascii_lowercase();
    if lower == label || lower.strip_suffix('s') == Some(label.as_str()) {
        return true;
    }
    lower
        .strip_suffix("ies")
        .zip(label.strip_suffix('y'))
        .is_some_and(|(a, b)| a == b)
}

/// Whether a resolved condition reads any of the given aliases.
fn touches_alias(condition: &Condition, targets: &[&str]) -> bool {
    match condition {
        Condition::Any(children) => children.iter().any(|c| touches_alias(c, targets)),
        Condition::Raw { text } => QUALIFIER_RE
            .captures_iter(text)
            .any(|caps| targets.contains(&&caps[1])),
        Condition::Exists(_) => false,
        other => other
            .column()
            .and_then(|column| column.split_once('.'))
            .is_some_and(|(qualifier, _)| targets.contains(&qualifier)),
    }
}

/// `MATCH ... WHERE ... OPTIONAL MATCH ... [WITH * WHERE ...]`, the part both
/// strategies share.
///
/// Filters on a left-joined alias are applied after its OPTIONAL MATCH; in
/// the leading WHERE the alias would not be bound yet.
pub(crate) fn match_section(
    state: &QueryState,
    aliases: &AliasMap<'_>,
    clauses: &ClauseBuilder,
    bindings: &mut Bindings,
) -> CompileResult<Vec<String>> {
    if state.target.label.trim().is_empty() {
        return Err(CompileError::EmptyLabel);
    }
    let alias = aliases.primary();

    let mut head = clauses.build_match(&state.target.label, alias, &[], bindings);
    let mut optional: Vec<&Join> = Vec::new();

    for join in &state.joins {
        match join.kind {
            JoinKind::Inner | JoinKind::Cross => {
                head.push_str(", ");
                head.push_str(&node_pattern(&join.label, &join.alias));
            }
            JoinKind::Left => optional.push(join),
        }
    }
    let optional_aliases: Vec<&str> = optional.iter().map(|j| j.alias.as_str()).collect();

    let (deferred, immediate): (Vec<Condition>, Vec<Condition>) = state
        .wheres
        .iter()
        .map(|c| aliases.resolve_condition(c))
        .partition(|c| touches_alias(c, &optional_aliases));

    let mut conditions = clauses.render_conditions(&immediate, Scope::Node(alias), bindings)?;
    conditions.extend(
        state
            .joins
            .iter()
            .filter(|j| j.kind != JoinKind::Left)
            .filter_map(|j| j.on.as_ref())
            .map(|on| aliases.join_condition(on)),
    );

    let mut section = vec![head, where_clause(&conditions)];
    for join in optional {
        let mut text = clauses.build_optional_match(&join.label, &join.alias);
        if let Some(on) = &join.on {
            text.push(' ');
            text.push_str(&where_clause(&[aliases.join_condition(on)]));
        }
        section.push(text);
    }

    if !deferred.is_empty() {
        let late = clauses.render_conditions(&deferred, Scope::Node(alias), bindings)?;
        debug!(count = late.len(), "filtering after optional match");
        section.push(format!("WITH * {}", where_clause(&late)));
    }
    Ok(section)
}
