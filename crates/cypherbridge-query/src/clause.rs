//! Clause component builders.
//!
//! Each builder turns already-structured input into one clause of text.
//! Builders hold no state beyond the immutable compiler options; the only
//! thing they write to is the caller-owned [`Bindings`].

use crate::compiled::Bindings;
use crate::error::{CompileError, CompileResult};
use crate::exists::{ExistsBuilder, RelationExists};
use crate::expression::{prefix_columns, split_alias, split_items};
use crate::state::{Column, Condition, Operator, Order};
use cypherbridge_config::{CompilerConfig, LikeMode};
use serde_json::Value;

/// Prefix for parameters bound while rendering HAVING conditions.
pub const HAVING_PARAM_PREFIX: &str = "having_";

/// What bare column names in a condition refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// Properties of the node bound to this alias
    Node(&'a str),
    /// Names projected by a preceding WITH clause
    Projected,
}

/// Qualify a column with an alias unless it already carries one.
pub fn qualify(column: &str, alias: &str) -> String {
    if column.contains('.') {
        column.to_string()
    } else {
        format!("{}.{}", alias, column)
    }
}

/// Backtick-quote a label unless it is a plain identifier.
pub fn escape_label(label: &str) -> String {
    let plain = label
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && label.chars().all(|c| c.is_alphanumeric() || c == '_');
    if plain {
        label.to_string()
    } else {
        format!("`{}`", label.replace('`', "``"))
    }
}

/// `(alias:Label)` or `(alias)` when the label is empty.
pub fn node_pattern(label: &str, alias: &str) -> String {
    if label.is_empty() {
        format!("({})", alias)
    } else {
        format!("({}:{})", alias, escape_label(label))
    }
}

/// One element of a LIKE pattern after escapes are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeToken {
    Literal(char),
    /// `%`
    AnyRun,
    /// `_`
    AnyOne,
}

impl LikeToken {
    fn is_wildcard(&self) -> bool {
        !matches!(self, LikeToken::Literal(_))
    }
}

/// `\x` is always the literal `x`; a trailing lone backslash is dropped.
fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        let token = match c {
            '\\' => match chars.next() {
                Some(escaped) => LikeToken::Literal(escaped),
                None => continue,
            },
            '%' => LikeToken::AnyRun,
            '_' => LikeToken::AnyOne,
            other => LikeToken::Literal(other),
        };
        tokens.push(token);
    }
    tokens
}

/// Plain text for tokens used as a substring; wildcards stay as written.
fn like_literal(tokens: &[LikeToken]) -> String {
    tokens
        .iter()
        .map(|t| match t {
            LikeToken::Literal(c) => *c,
            LikeToken::AnyRun => '%',
            LikeToken::AnyOne => '_',
        })
        .collect()
}

/// Bounds of the tokens left after stripping unescaped `%` at both ends.
fn like_core(tokens: &[LikeToken]) -> (usize, usize) {
    let start = tokens
        .iter()
        .take_while(|t| **t == LikeToken::AnyRun)
        .count();
    let end = tokens.len()
        - tokens[start..]
            .iter()
            .rev()
            .take_while(|t| **t == LikeToken::AnyRun)
            .count();
    (start, end)
}

/// Translate a SQL LIKE pattern into an equivalent full-match regex.
pub fn like_to_regex(pattern: &str) -> String {
    like_tokens(pattern)
        .iter()
        .map(|t| match t {
            LikeToken::Literal(c) => regex::escape(&c.to_string()),
            LikeToken::AnyRun => ".*".to_string(),
            LikeToken::AnyOne => ".".to_string(),
        })
        .collect()
}

/// Builds individual clauses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClauseBuilder {
    like_mode: LikeMode,
}

impl ClauseBuilder {
    pub fn new(like_mode: LikeMode) -> Self {
        Self { like_mode }
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self::new(config.like_mode)
    }

    pub fn like_mode(&self) -> LikeMode {
        self.like_mode
    }

    // ========================================================================
    // MATCH
    // ========================================================================

    /// `MATCH (alias:Label {k: $k, ...})`.
    ///
    /// Null-valued equalities cannot be expressed inline and are dropped;
    /// callers emit them as `IS NULL` conditions instead.
    pub fn build_match(
        &self,
        label: &str,
        alias: &str,
        equalities: &[(String, Value)],
        bindings: &mut Bindings,
    ) -> String {
        let properties = self.inline_properties(equalities, bindings);
        let pattern = node_pattern(label, alias);
        if properties.is_empty() {
            format!("MATCH {}", pattern)
        } else {
            format!(
                "MATCH {} {{{}}})",
                &pattern[..pattern.len() - 1],
                properties
            )
        }
    }

    pub fn build_optional_match(&self, label: &str, alias: &str) -> String {
        format!("OPTIONAL MATCH {}", node_pattern(label, alias))
    }

    fn inline_properties(&self, entries: &[(String, Value)], bindings: &mut Bindings) -> String {
        entries
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| {
                let key = strip_qualifier(key);
                let param = bindings.bind(key, value.clone());
                format!("{}: ${}", key, param)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    // ========================================================================
    // WHERE
    // ========================================================================

    /// `WHERE a AND b ...`, or an empty string when there is nothing to filter.
    pub fn build_where(
        &self,
        conditions: &[Condition],
        alias: &str,
        bindings: &mut Bindings,
    ) -> CompileResult<String> {
        let rendered = self.render_conditions(conditions, Scope::Node(alias), bindings)?;
        Ok(where_clause(&rendered))
    }

    pub fn render_conditions(
        &self,
        conditions: &[Condition],
        scope: Scope<'_>,
        bindings: &mut Bindings,
    ) -> CompileResult<Vec<String>> {
        conditions
            .iter()
            .map(|c| self.render_condition(c, scope, bindings))
            .collect()
    }

    pub fn render_condition(
        &self,
        condition: &Condition,
        scope: Scope<'_>,
        bindings: &mut Bindings,
    ) -> CompileResult<String> {
        let text = match condition {
            Condition::Basic {
                column,
                operator,
                value,
            } => self.render_basic(column, *operator, value, scope, bindings),
            Condition::In { column, values } => {
                let param = bindings.bind(&param_hint(column, scope), Value::Array(values.clone()));
                format!("{} IN ${}", column_ref(column, scope), param)
            }
            Condition::NotIn { column, values } => {
                let param = bindings.bind(&param_hint(column, scope), Value::Array(values.clone()));
                format!("NOT {} IN ${}", column_ref(column, scope), param)
            }
            Condition::Null { column } => format!("{} IS NULL", column_ref(column, scope)),
            Condition::NotNull { column } => format!("{} IS NOT NULL", column_ref(column, scope)),
            Condition::Between { column, low, high } => {
                let hint = param_hint(column, scope);
                let min = bindings.bind(&format!("{}_min", hint), low.clone());
                let max = bindings.bind(&format!("{}_max", hint), high.clone());
                let target = column_ref(column, scope);
                format!("{} >= ${} AND {} <= ${}", target, min, target, max)
            }
            Condition::Raw { text } => text.clone(),
            Condition::Any(children) => {
                let parts = self
                    .render_conditions(children, scope, bindings)?
                    .into_iter()
                    .map(|p| if p.contains(" AND ") { format!("({})", p) } else { p })
                    .collect::<Vec<_>>();
                format!("({})", parts.join(" OR "))
            }
            Condition::Exists(predicate) => self.render_exists(predicate, scope, bindings)?,
        };
        Ok(text)
    }

    fn render_exists(
        &self,
        predicate: &RelationExists,
        scope: Scope<'_>,
        bindings: &mut Bindings,
    ) -> CompileResult<String> {
        match scope {
            Scope::Node(alias) => ExistsBuilder::new(*self).build(predicate, alias, bindings),
            Scope::Projected => Err(CompileError::UnboundHavingReference {
                column: format!("EXISTS on {}", predicate.relation.related_label()),
                bound: Vec::new(),
            }),
        }
    }

    fn render_basic(
        &self,
        column: &str,
        operator: Operator,
        value: &Value,
        scope: Scope<'_>,
        bindings: &mut Bindings,
    ) -> String {
        let target = match scope {
            Scope::Node(alias) if is_identity_column(column) => identity_ref(column, alias),
            _ => column_ref(column, scope),
        };

        if value.is_null() {
            match operator {
                Operator::Eq => return format!("{} IS NULL", target),
                Operator::NotEq => return format!("{} IS NOT NULL", target),
                _ => {}
            }
        }

        let hint = param_hint(column, scope);
        match operator {
            Operator::Like | Operator::NotLike => {
                let (op, bound) = self.resolve_like(value);
                let param = bindings.bind(&hint, bound);
                let negate = if operator == Operator::NotLike { "NOT " } else { "" };
                format!("{}{} {} ${}", negate, target, op, param)
            }
            other => {
                let param = bindings.bind(&hint, value.clone());
                format!("{} {} ${}", target, other.cypher(), param)
            }
        }
    }

    /// Choose the operator and bound value for a LIKE pattern.
    fn resolve_like(&self, value: &Value) -> (&'static str, Value) {
        let Some(pattern) = value.as_str() else {
            return ("CONTAINS", value.clone());
        };
        let tokens = like_tokens(pattern);
        let (start, end) = like_core(&tokens);

        match self.like_mode {
            LikeMode::Contains => ("CONTAINS", Value::String(like_literal(&tokens[start..end]))),
            LikeMode::Regex => ("=~", Value::String(like_to_regex(pattern))),
            LikeMode::Auto => {
                if !tokens.iter().any(LikeToken::is_wildcard) {
                    return ("CONTAINS", Value::String(like_literal(&tokens)));
                }
                let core = &tokens[start..end];
                if core.is_empty() || core.iter().any(LikeToken::is_wildcard) {
                    return ("=~", Value::String(like_to_regex(pattern)));
                }
                let op = match (start > 0, end < tokens.len()) {
                    (true, true) => "CONTAINS",
                    (false, true) => "STARTS WITH",
                    (true, false) => "ENDS WITH",
                    (false, false) => return ("=~", Value::String(like_to_regex(pattern))),
                };
                (op, Value::String(like_literal(core)))
            }
        }
    }

    // ========================================================================
    // RETURN / WITH / ORDER BY / LIMIT
    // ========================================================================

    /// Return items: the bare alias first, then each requested column.
    pub fn return_items(&self, columns: &[Column], alias: &str) -> Vec<String> {
        let mut items = vec![alias.to_string()];
        for column in columns {
            match column {
                Column::All => {}
                Column::Name(name) => push_unique(&mut items, property_ref(name, alias)),
                Column::Raw(expression) => {
                    for item in split_items(expression) {
                        let (expr, as_alias) = split_alias(&item);
                        let rewritten = prefix_columns(&expr, alias);
                        let rendered = match as_alias {
                            Some(a) => format!("{} AS {}", rewritten, a),
                            None => rewritten,
                        };
                        push_unique(&mut items, rendered);
                    }
                }
            }
        }
        items
    }

    pub fn build_return(&self, columns: &[Column], alias: &str, distinct: bool) -> String {
        return_clause(&self.return_items(columns, alias), distinct)
    }

    pub fn build_with(&self, items: &[String]) -> String {
        if items.is_empty() {
            String::new()
        } else {
            format!("WITH {}", items.join(", "))
        }
    }

    pub fn build_order_by(&self, orders: &[Order], alias: &str) -> String {
        let items: Vec<String> = orders
            .iter()
            .map(|order| match order {
                Order::Column { column, direction } => {
                    format!("{} {}", property_ref(column, alias), direction.keyword())
                }
                Order::Raw(expression) => expression.clone(),
            })
            .collect();
        order_by_clause(&items)
    }

    /// `SKIP <offset> LIMIT <limit>`; skip always precedes limit.
    pub fn build_limit(limit: Option<u64>, offset: Option<u64>) -> String {
        let mut parts = Vec::new();
        if let Some(offset) = offset {
            parts.push(format!("SKIP {}", offset));
        }
        if let Some(limit) = limit {
            parts.push(format!("LIMIT {}", limit));
        }
        parts.join(" ")
    }

    // ========================================================================
    // SET / CREATE / DELETE
    // ========================================================================

    /// `SET alias.k = $k, ...`. Table qualifiers are stripped from keys.
    pub fn build_set(
        &self,
        values: &[(String, Value)],
        alias: &str,
        bindings: &mut Bindings,
    ) -> String {
        if values.is_empty() {
            return String::new();
        }
        let assignments: Vec<String> = values
            .iter()
            .map(|(key, value)| {
                let key = strip_qualifier(key);
                let param = bindings.bind(key, value.clone());
                format!("{}.{} = ${}", alias, key, param)
            })
            .collect();
        format!("SET {}", assignments.join(", "))
    }

    pub fn build_create(
        &self,
        label: &str,
        attributes: &[(String, Value)],
        alias: &str,
        bindings: &mut Bindings,
    ) -> String {
        let properties = self.inline_properties(attributes, bindings);
        let pattern = node_pattern(label, alias);
        if properties.is_empty() {
            format!("CREATE {}", pattern)
        } else {
            format!("CREATE {} {{{}}})", &pattern[..pattern.len() - 1], properties)
        }
    }

    /// `DETACH DELETE alias` unless `detach` is false. A plain delete fails
    /// on any node that still has relationships.
    pub fn build_delete(alias: &str, detach: bool) -> String {
        if detach {
            format!("DETACH DELETE {}", alias)
        } else {
            format!("DELETE {}", alias)
        }
    }
}

// ============================================================================
// Helpers shared with the strategies
// ============================================================================

pub(crate) fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

pub(crate) fn return_clause(items: &[String], distinct: bool) -> String {
    let distinct = if distinct { "DISTINCT " } else { "" };
    format!("RETURN {}{}", distinct, items.join(", "))
}

pub(crate) fn order_by_clause(items: &[String]) -> String {
    if items.is_empty() {
        String::new()
    } else {
        format!("ORDER BY {}", items.join(", "))
    }
}

pub(crate) fn push_unique(items: &mut Vec<String>, item: String) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// Join non-empty clauses with single spaces.
pub(crate) fn assemble<I, S>(clauses: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    clauses
        .into_iter()
        .filter(|c| !c.as_ref().is_empty())
        .map(|c| c.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_qualifier(key: &str) -> &str {
    key.rsplit('.').next().unwrap_or(key)
}

fn is_identity_column(column: &str) -> bool {
    strip_qualifier(column) == "id"
}

/// `id(alias)` for `id`, `id(u)` for `u.id`.
pub(crate) fn identity_ref(column: &str, alias: &str) -> String {
    match column.rsplit_once('.') {
        Some((qualifier, _)) => format!("id({})", qualifier),
        None => format!("id({})", alias),
    }
}

/// A column as read off a node: `id` maps to the identity function.
pub(crate) fn property_ref(column: &str, alias: &str) -> String {
    if is_identity_column(column) {
        identity_ref(column, alias)
    } else {
        qualify(column, alias)
    }
}

fn column_ref(column: &str, scope: Scope<'_>) -> String {
    match scope {
        Scope::Node(alias) => qualify(column, alias),
        Scope::Projected => column.to_string(),
    }
}

fn param_hint(column: &str, scope: Scope<'_>) -> String {
    match scope {
        Scope::Node(_) => column.to_string(),
        Scope::Projected => format!("{}{}", HAVING_PARAM_PREFIX, column),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Direction;
    use serde_json::json;

    fn where_text(conditions: &[Condition]) -> (String, Bindings) {
        let mut bindings = Bindings::new();
        let text = ClauseBuilder::default()
            .build_where(conditions, "n", &mut bindings)
            .unwrap();
        (text, bindings)
    }

    // =========================================================================
    // MATCH
    // =========================================================================

    #[test]
    fn test_match_plain() {
        let mut bindings = Bindings::new();
        let text = ClauseBuilder::default().build_match("Post", "p", &[], &mut bindings);
        assert_eq!(text, "MATCH (p:Post)");
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_match_inline_equalities_drop_nulls() {
        let mut bindings = Bindings::new();
        let text = ClauseBuilder::default().build_match(
            "User",
            "u",
            &[
                ("email".to_string(), json!("a@b.c")),
                ("deleted_at".to_string(), Value::Null),
                ("active".to_string(), json!(true)),
            ],
            &mut bindings,
        );
        assert_eq!(text, "MATCH (u:User {email: $email, active: $active})");
        assert_eq!(bindings.len(), 2);
        assert!(!bindings.contains("deleted_at"));
    }

    #[test]
    fn test_match_escapes_odd_label() {
        let mut bindings = Bindings::new();
        let text = ClauseBuilder::default().build_match("Blog Post", "p", &[], &mut bindings);
        assert_eq!(text, "MATCH (p:`Blog Post`)");
    }

    // =========================================================================
    // WHERE
    // =========================================================================

    #[test]
    fn test_where_identity_column() {
        let (text, bindings) = where_text(&[Condition::basic("id", Operator::Eq, 5)]);
        assert_eq!(text, "WHERE id(n) = $id");
        assert_eq!(bindings.get("id"), Some(&json!(5)));
    }

    #[test]
    fn test_where_not_equal_translated() {
        let (text, bindings) = where_text(&[Condition::basic("status", Operator::NotEq, "x")]);
        assert_eq!(text, "WHERE n.status <> $status");
        assert_eq!(bindings.get("status"), Some(&json!("x")));
    }

    #[test]
    fn test_where_empty() {
        let (text, bindings) = where_text(&[]);
        assert_eq!(text, "");
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_where_null_comparison_rewritten() {
        let (text, bindings) = where_text(&[
            Condition::basic("parent", Operator::Eq, Value::Null),
            Condition::basic("owner", Operator::NotEq, Value::Null),
        ]);
        assert_eq!(text, "WHERE n.parent IS NULL AND n.owner IS NOT NULL");
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_where_in_not_in_null_between() {
        let (text, bindings) = where_text(&[
            Condition::In {
                column: "tag".to_string(),
                values: vec![json!("a"), json!("b")],
            },
            Condition::NotIn {
                column: "state".to_string(),
                values: vec![json!("gone")],
            },
            Condition::Null {
                column: "deleted_at".to_string(),
            },
            Condition::NotNull {
                column: "email".to_string(),
            },
            Condition::Between {
                column: "age".to_string(),
                low: json!(18),
                high: json!(65),
            },
        ]);
        assert_eq!(
            text,
            "WHERE n.tag IN $tag AND NOT n.state IN $state AND n.deleted_at IS NULL \
             AND n.email IS NOT NULL AND n.age >= $age_min AND n.age <= $age_max"
        );
        assert_eq!(bindings.get("tag"), Some(&json!(["a", "b"])));
        assert_eq!(bindings.get("age_min"), Some(&json!(18)));
        assert_eq!(bindings.get("age_max"), Some(&json!(65)));
    }

    #[test]
    fn test_where_raw_verbatim() {
        let (text, _) = where_text(&[Condition::raw("size(n.tags) > 2")]);
        assert_eq!(text, "WHERE size(n.tags) > 2");
    }

    #[test]
    fn test_where_qualified_column_and_collision() {
        let (text, bindings) = where_text(&[
            Condition::basic("u.name", Operator::Eq, "ann"),
            Condition::basic("name", Operator::Eq, "bob"),
            Condition::basic("name", Operator::Eq, "cy"),
        ]);
        assert_eq!(
            text,
            "WHERE u.name = $u_name AND n.name = $name AND n.name = $name_1"
        );
        assert_eq!(bindings.get("name_1"), Some(&json!("cy")));
    }

    #[test]
    fn test_where_qualified_identity() {
        let (text, _) = where_text(&[Condition::basic("u.id", Operator::Eq, 3)]);
        assert_eq!(text, "WHERE id(u) = $u_id");
    }

    #[test]
    fn test_where_any_group() {
        let (text, _) = where_text(&[Condition::Any(vec![
            Condition::basic("a", Operator::Eq, 1),
            Condition::Between {
                column: "b".to_string(),
                low: json!(1),
                high: json!(2),
            },
        ])]);
        assert_eq!(
            text,
            "WHERE (n.a = $a OR (n.b >= $b_min AND n.b <= $b_max))"
        );
    }

    #[test]
    fn test_projected_scope_uses_having_prefix() {
        let mut bindings = Bindings::new();
        let text = ClauseBuilder::default()
            .render_condition(
                &Condition::basic("total", Operator::Gt, 3),
                Scope::Projected,
                &mut bindings,
            )
            .unwrap();
        assert_eq!(text, "total > $having_total");
        assert_eq!(bindings.get("having_total"), Some(&json!(3)));
    }

    // =========================================================================
    // LIKE
    // =========================================================================

    fn like(mode: LikeMode, operator: Operator, pattern: &str) -> (String, Value) {
        let mut bindings = Bindings::new();
        let text = ClauseBuilder::new(mode)
            .build_where(&[Condition::basic("title", operator, pattern)], "n", &mut bindings)
            .unwrap();
        let bound = bindings.get("title").cloned().unwrap();
        (text, bound)
    }

    #[test]
    fn test_like_auto_surrounding_wildcards() {
        let (text, bound) = like(LikeMode::Auto, Operator::Like, "%rust%");
        assert_eq!(text, "WHERE n.title CONTAINS $title");
        assert_eq!(bound, json!("rust"));
    }

    #[test]
    fn test_like_auto_prefix_and_suffix() {
        let (text, bound) = like(LikeMode::Auto, Operator::Like, "rust%");
        assert_eq!(text, "WHERE n.title STARTS WITH $title");
        assert_eq!(bound, json!("rust"));

        let (text, bound) = like(LikeMode::Auto, Operator::Like, "%guide");
        assert_eq!(text, "WHERE n.title ENDS WITH $title");
        assert_eq!(bound, json!("guide"));
    }

    #[test]
    fn test_like_auto_plain_value_is_substring() {
        let (text, bound) = like(LikeMode::Auto, Operator::Like, "rust");
        assert_eq!(text, "WHERE n.title CONTAINS $title");
        assert_eq!(bound, json!("rust"));
    }

    #[test]
    fn test_like_auto_inner_wildcard_is_regex() {
        let (text, bound) = like(LikeMode::Auto, Operator::Like, "a%b_c");
        assert_eq!(text, "WHERE n.title =~ $title");
        assert_eq!(bound, json!("a.*b.c"));
    }

    #[test]
    fn test_not_like_negated() {
        let (text, _) = like(LikeMode::Auto, Operator::NotLike, "%spam%");
        assert_eq!(text, "WHERE NOT n.title CONTAINS $title");
    }

    #[test]
    fn test_like_forced_modes() {
        let (text, bound) = like(LikeMode::Regex, Operator::Like, "%a.b%");
        assert_eq!(text, "WHERE n.title =~ $title");
        assert_eq!(bound, json!(r".*a\.b.*"));

        let (text, bound) = like(LikeMode::Contains, Operator::Like, "%a_b%");
        assert_eq!(text, "WHERE n.title CONTAINS $title");
        assert_eq!(bound, json!("a_b"));
    }

    #[test]
    fn test_like_auto_escaped_percent_is_literal() {
        let (text, bound) = like(LikeMode::Auto, Operator::Like, r"50\%%");
        assert_eq!(text, "WHERE n.title STARTS WITH $title");
        assert_eq!(bound, json!("50%"));

        let (text, bound) = like(LikeMode::Auto, Operator::Like, r"%\_id");
        assert_eq!(text, "WHERE n.title ENDS WITH $title");
        assert_eq!(bound, json!("_id"));

        let (text, bound) = like(LikeMode::Auto, Operator::Like, r"100\%");
        assert_eq!(text, "WHERE n.title CONTAINS $title");
        assert_eq!(bound, json!("100%"));
    }

    #[test]
    fn test_like_contains_mode_keeps_escaped_edges() {
        let (_, bound) = like(LikeMode::Contains, Operator::Like, r"%off\%%");
        assert_eq!(bound, json!("off%"));
    }

    #[test]
    fn test_like_to_regex_escapes() {
        assert_eq!(like_to_regex(r"100\%"), "100%");
        assert_eq!(like_to_regex("a+b%"), r"a\+b.*");
    }

    // =========================================================================
    // RETURN / ORDER BY / LIMIT
    // =========================================================================

    #[test]
    fn test_return_alias_first() {
        let text = ClauseBuilder::default().build_return(
            &[Column::from("title"), Column::from("*"), Column::from("u.name")],
            "p",
            false,
        );
        assert_eq!(text, "RETURN p, p.title, u.name");
    }

    #[test]
    fn test_return_raw_split_with_aliases() {
        let text = ClauseBuilder::default().build_return(
            &[Column::Raw("upper(name) AS label, coalesce(a, b) AS pick".to_string())],
            "n",
            true,
        );
        assert_eq!(
            text,
            "RETURN DISTINCT n, upper(n.name) AS label, coalesce(n.a, n.b) AS pick"
        );
    }

    #[test]
    fn test_order_by() {
        let text = ClauseBuilder::default().build_order_by(
            &[
                Order::Column {
                    column: "views".to_string(),
                    direction: Direction::Desc,
                },
                Order::Column {
                    column: "title".to_string(),
                    direction: Direction::Asc,
                },
                Order::Raw("rand()".to_string()),
            ],
            "p",
        );
        assert_eq!(text, "ORDER BY p.views DESC, p.title ASC, rand()");
        assert_eq!(ClauseBuilder::default().build_order_by(&[], "p"), "");
    }

    #[test]
    fn test_identity_column_in_return_and_order() {
        let builder = ClauseBuilder::default();
        let order = builder.build_order_by(
            &[Order::Column {
                column: "id".to_string(),
                direction: Direction::Asc,
            }],
            "n",
        );
        assert_eq!(order, "ORDER BY id(n) ASC");

        let text = builder.build_return(&[Column::from("id"), Column::from("u.id")], "n", false);
        assert_eq!(text, "RETURN n, id(n), id(u)");
    }

    #[test]
    fn test_limit_and_skip() {
        assert_eq!(ClauseBuilder::build_limit(Some(10), Some(20)), "SKIP 20 LIMIT 10");
        assert_eq!(ClauseBuilder::build_limit(None, None), "");
        assert_eq!(ClauseBuilder::build_limit(Some(5), None), "LIMIT 5");
        assert_eq!(ClauseBuilder::build_limit(None, Some(3)), "SKIP 3");
    }

    // =========================================================================
    // SET / CREATE / DELETE
    // =========================================================================

    #[test]
    fn test_set_strips_qualifier() {
        let mut bindings = Bindings::new();
        let text = ClauseBuilder::default().build_set(
            &[
                ("users.name".to_string(), json!("ann")),
                ("age".to_string(), json!(30)),
            ],
            "u",
            &mut bindings,
        );
        assert_eq!(text, "SET u.name = $name, u.age = $age");
        assert_eq!(bindings.get("name"), Some(&json!("ann")));
    }

    #[test]
    fn test_create() {
        let mut bindings = Bindings::new();
        let builder = ClauseBuilder::default();
        let text = builder.build_create(
            "Post",
            &[("title".to_string(), json!("Hello"))],
            "n",
            &mut bindings,
        );
        assert_eq!(text, "CREATE (n:Post {title: $title})");
        assert_eq!(builder.build_create("Tag", &[], "t", &mut bindings), "CREATE (t:Tag)");
    }

    #[test]
    fn test_delete_detach_and_plain() {
        assert_eq!(ClauseBuilder::build_delete("n", true), "DETACH DELETE n");
        assert_eq!(ClauseBuilder::build_delete("n", false), "DELETE n");
    }
}
