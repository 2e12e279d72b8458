//! Aggregation strategy: grouping and HAVING.
//!
//! Cypher has no GROUP BY. Grouping keys and aggregates are bound in a WITH
//! clause, HAVING becomes a WHERE after it, and everything downstream may only
//! refer to the names the WITH clause assigned:
//!
//! MATCH -> WHERE -> OPTIONAL MATCH -> WITH -> WHERE (having) -> RETURN -> ORDER BY -> SKIP/LIMIT

use super::{match_section, AliasMap, QueryStrategy, StandardStrategy};
use crate::clause::{assemble, order_by_clause, return_clause, where_clause, ClauseBuilder, Scope};
use crate::compiled::{Bindings, CompiledQuery};
use crate::error::{CompileError, CompileResult};
use crate::expression::{prefix_columns, split_alias, split_items};
use crate::state::{Column, Condition, Order, QueryState};
use cypherbridge_config::CompilerConfig;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

static AGGREGATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(count|sum|avg|min|max|collect)\s*\(").unwrap());

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").unwrap());

/// Byte offset just past the `)` closing a call whose `(` ends at `open`.
/// Quoted text is skipped; `None` when the parentheses never balance.
fn call_end(text: &str, open: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (offset, c) in text[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn normalize(expression: &str) -> String {
    expression
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Items bound by the WITH clause and the expressions that map to them.
#[derive(Debug, Default)]
struct WithList {
    items: Vec<(String, String)>,
    keys: Vec<(String, String)>,
}

impl WithList {
    fn push(&mut self, expression: String, alias: String, keys: &[&str]) {
        if self.items.iter().any(|(_, bound)| *bound == alias) {
            return;
        }
        for key in keys.iter().copied().chain(std::iter::once(expression.as_str())) {
            self.keys.push((normalize(key), alias.clone()));
        }
        self.items.push((expression, alias));
    }

    /// Bound alias for a name or an expression that was bound.
    fn lookup(&self, name: &str) -> Option<&str> {
        if let Some((_, alias)) = self.items.iter().find(|(_, alias)| alias == name) {
            return Some(alias.as_str());
        }
        let key = normalize(name);
        self.keys
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, alias)| alias.as_str())
    }

    fn aliases(&self) -> Vec<String> {
        self.items.iter().map(|(_, alias)| alias.clone()).collect()
    }

    fn clause_items(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|(expression, alias)| format!("{} AS {}", expression, alias))
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub struct AggregationStrategy {
    config: CompilerConfig,
    clauses: ClauseBuilder,
}

impl AggregationStrategy {
    pub fn new(config: CompilerConfig) -> Self {
        let clauses = ClauseBuilder::from_config(&config);
        Self { config, clauses }
    }

    /// `SUM(views)` -> `sum(n.views)`
    fn rewrite_aggregate(&self, expression: &str, aliases: &AliasMap<'_>) -> String {
        let resolved = aliases.resolve_qualifiers(expression);
        let lowered = AGGREGATE_RE.replace_all(&resolved, |caps: &Captures<'_>| {
            format!("{}(", caps[1].to_lowercase())
        });
        prefix_columns(&lowered, aliases.primary())
    }

    /// `status` -> (`n.status`, `status`); `users.name` -> (`u.name`, `users_name`)
    fn key_item(&self, column: &str, aliases: &AliasMap<'_>) -> (String, String) {
        let expression = aliases.reference(column);
        let name = match column.split_once('.') {
            Some((qualifier, name)) if aliases.alias_for(qualifier) != aliases.primary() => {
                format!("{}_{}", qualifier, name)
            }
            Some((_, name)) => name.to_string(),
            None => column.to_string(),
        };
        (expression, name)
    }

    fn build_with_list(&self, state: &QueryState, aliases: &AliasMap<'_>) -> CompileResult<WithList> {
        let mut with = WithList::default();

        for group in &state.groups {
            let (expression, name) = self.key_item(group, aliases);
            with.push(expression, name, &[group.as_str()]);
        }

        for column in &state.columns {
            match column {
                Column::All => {}
                Column::Name(name) => {
                    let (expression, alias) = self.key_item(name, aliases);
                    with.push(expression, alias, &[name.as_str()]);
                }
                Column::Raw(text) => {
                    for item in split_items(text) {
                        self.bind_raw_item(&item, aliases, &mut with)?;
                    }
                }
            }
        }
        Ok(with)
    }

    fn bind_raw_item(
        &self,
        item: &str,
        aliases: &AliasMap<'_>,
        with: &mut WithList,
    ) -> CompileResult<()> {
        let (expression, alias) = split_alias(item);

        if AGGREGATE_RE.is_match(&expression) {
            let Some(alias) = alias else {
                return Err(CompileError::UnaliasedAggregate { expression });
            };
            let rewritten = self.rewrite_aggregate(&expression, aliases);
            with.push(rewritten, alias, &[expression.as_str()]);
            return Ok(());
        }

        match alias {
            Some(alias) => {
                let resolved = aliases.resolve_qualifiers(&expression);
                let rewritten = prefix_columns(&resolved, aliases.primary());
                with.push(rewritten, alias, &[expression.as_str()]);
            }
            None if IDENTIFIER_RE.is_match(&expression) => {
                let (rewritten, alias) = self.key_item(&expression, aliases);
                with.push(rewritten, alias, &[expression.as_str()]);
            }
            None => debug!("Skipping unaliased column `{}` in aggregation", expression),
        }
        Ok(())
    }

    fn bind_having(
        &self,
        condition: &Condition,
        with: &WithList,
        aliases: &AliasMap<'_>,
    ) -> CompileResult<Condition> {
        match condition {
            Condition::Raw { text } => Ok(Condition::raw(self.rewrite_having_text(text, with, aliases)?)),
            Condition::Any(children) => Ok(Condition::Any(
                children
                    .iter()
                    .map(|c| self.bind_having(c, with, aliases))
                    .collect::<CompileResult<Vec<_>>>()?,
            )),
            other => match other.column() {
                Some(column) => {
                    let bound = with
                        .lookup(column)
                        .or_else(|| with.lookup(&self.rewrite_aggregate(column, aliases)))
                        .ok_or_else(|| CompileError::UnboundHavingReference {
                            column: column.to_string(),
                            bound: with.aliases(),
                        })?;
                    Ok(other.with_column(bound.to_string()))
                }
                None => Ok(other.clone()),
            },
        }
    }

    /// Replace aggregate calls in HAVING text with their WITH aliases.
    fn rewrite_having_text(
        &self,
        text: &str,
        with: &WithList,
        aliases: &AliasMap<'_>,
    ) -> CompileResult<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        while let Some(head) = AGGREGATE_RE.find_at(text, last) {
            let end = call_end(text, head.end()).ok_or_else(|| {
                CompileError::UnboundHavingReference {
                    column: text[head.start()..].to_string(),
                    bound: with.aliases(),
                }
            })?;
            let expression = &text[head.start()..end];
            let alias = with
                .lookup(expression)
                .or_else(|| with.lookup(&self.rewrite_aggregate(expression, aliases)))
                .ok_or_else(|| CompileError::UnboundHavingReference {
                    column: expression.to_string(),
                    bound: with.aliases(),
                })?;
            out.push_str(&text[last..head.start()]);
            out.push_str(alias);
            last = end;
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    fn order_items(
        &self,
        orders: &[Order],
        with: &WithList,
        aliases: &AliasMap<'_>,
    ) -> CompileResult<Vec<String>> {
        orders
            .iter()
            .map(|order| match order {
                Order::Column { column, direction } => {
                    let bound = with
                        .lookup(column)
                        .or_else(|| with.lookup(&aliases.reference(column)))
                        .ok_or_else(|| CompileError::UnboundOrderColumn {
                            column: column.clone(),
                            bound: with.aliases(),
                        })?;
                    Ok(format!("{} {}", bound, direction.keyword()))
                }
                Order::Raw(text) => Ok(text.clone()),
            })
            .collect()
    }
}

impl Default for AggregationStrategy {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

impl QueryStrategy for AggregationStrategy {
    fn name(&self) -> &'static str {
        "aggregation"
    }

    fn compile(&self, state: &QueryState) -> CompileResult<CompiledQuery> {
        let alias = state.alias_or(&self.config.default_alias);
        let aliases = AliasMap::new(state, alias);

        let with = self.build_with_list(state, &aliases)?;
        if with.is_empty() {
            if let Some(having) = state.havings.first() {
                return Err(CompileError::UnboundHavingReference {
                    column: having.column().unwrap_or("<expression>").to_string(),
                    bound: Vec::new(),
                });
            }
            debug!("Nothing to bind in WITH, delegating to standard strategy");
            return StandardStrategy::new(self.config.clone()).compile(state);
        }

        let mut bindings = Bindings::new();
        let mut clauses = match_section(state, &aliases, &self.clauses, &mut bindings)?;
        clauses.push(self.clauses.build_with(&with.clause_items()));

        let havings = state
            .havings
            .iter()
            .map(|h| self.bind_having(h, &with, &aliases))
            .collect::<CompileResult<Vec<_>>>()?;
        let having_text = self
            .clauses
            .render_conditions(&havings, Scope::Projected, &mut bindings)?;
        clauses.push(where_clause(&having_text));

        clauses.push(return_clause(&with.aliases(), state.distinct));
        clauses.push(order_by_clause(&self.order_items(&state.orders, &with, &aliases)?));
        clauses.push(ClauseBuilder::build_limit(state.limit, state.offset));

        Ok(CompiledQuery::new(assemble(clauses), bindings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Direction, Join, Operator};
    use serde_json::json;

    fn compile(state: &QueryState) -> CompileResult<CompiledQuery> {
        AggregationStrategy::default().compile(state)
    }

    fn grouped() -> QueryState {
        QueryState::new("Post")
            .group_by("status")
            .select_raw("COUNT(*) AS total")
    }

    // =========================================================================
    // WITH construction
    // =========================================================================

    #[test]
    fn test_group_and_count_round_trip() {
        let compiled = compile(&grouped()).unwrap();
        assert_eq!(
            compiled.cypher(),
            "MATCH (n:Post) WITH n.status AS status, count(*) AS total RETURN status, total"
        );
        assert!(compiled.bindings().is_empty());
    }

    #[test]
    fn test_aggregate_arguments_prefixed() {
        let state = QueryState::new("Post")
            .group_by("author_id")
            .select_raw("SUM(views) AS views, avg(score) AS rating");
        assert_eq!(
            compile(&state).unwrap().cypher(),
            "MATCH (n:Post) WITH n.author_id AS author_id, sum(n.views) AS views, \
             avg(n.score) AS rating RETURN author_id, views, rating"
        );
    }

    #[test]
    fn test_duplicate_alias_bound_once() {
        let state = grouped().select("status");
        assert_eq!(
            compile(&state).unwrap().cypher(),
            "MATCH (n:Post) WITH n.status AS status, count(*) AS total RETURN status, total"
        );
    }

    #[test]
    fn test_unaliased_aggregate_rejected() {
        let state = QueryState::new("Post").group_by("status").select_raw("count(*)");
        assert_eq!(
            compile(&state).unwrap_err(),
            CompileError::UnaliasedAggregate {
                expression: "count(*)".to_string()
            }
        );
    }

    #[test]
    fn test_aliased_plain_expression_bound() {
        let state = QueryState::new("Post")
            .group_by("status")
            .select_raw("toUpper(category) AS category_label");
        assert_eq!(
            compile(&state).unwrap().cypher(),
            "MATCH (n:Post) WITH n.status AS status, toUpper(n.category) AS category_label \
             RETURN status, category_label"
        );
    }

    #[test]
    fn test_joined_group_key_named_by_table() {
        let state = QueryState::new("Post")
            .join(Join::left("User", "u", "posts.user_id", "users.id"))
            .group_by("users.name")
            .select_raw("count(*) AS posts");
        assert_eq!(
            compile(&state).unwrap().cypher(),
            "MATCH (n:Post) OPTIONAL MATCH (u:User) WHERE n.user_id = id(u) \
             WITH u.name AS users_name, count(*) AS posts RETURN users_name, posts"
        );
    }

    // =========================================================================
    // HAVING
    // =========================================================================

    #[test]
    fn test_raw_having_rewritten_to_alias() {
        let state = grouped().having(Condition::raw("COUNT(*) > 5"));
        assert_eq!(
            compile(&state).unwrap().cypher(),
            "MATCH (n:Post) WITH n.status AS status, count(*) AS total WHERE total > 5 RETURN status, total"
        );
    }

    #[test]
    fn test_having_on_alias_uses_prefixed_param() {
        let state = QueryState::new("Post")
            .where_basic("views", Operator::Gt, 10)
            .group_by("status")
            .select_raw("sum(views) AS views")
            .having(Condition::basic("views", Operator::Gte, 100));
        let compiled = compile(&state).unwrap();
        assert_eq!(
            compiled.cypher(),
            "MATCH (n:Post) WHERE n.views > $views WITH n.status AS status, sum(n.views) AS views \
             WHERE views >= $having_views RETURN status, views"
        );
        assert_eq!(compiled.bindings().get("views"), Some(&json!(10)));
        assert_eq!(compiled.bindings().get("having_views"), Some(&json!(100)));
    }

    #[test]
    fn test_having_on_aggregate_expression() {
        let state = grouped().having(Condition::basic("count(*)", Operator::Gte, 2));
        let compiled = compile(&state).unwrap();
        assert_eq!(
            compiled.cypher(),
            "MATCH (n:Post) WITH n.status AS status, count(*) AS total \
             WHERE total >= $having_total RETURN status, total"
        );
    }

    #[test]
    fn test_unbound_having_rejected() {
        let state = grouped().having(Condition::basic("score", Operator::Gt, 1));
        assert_eq!(
            compile(&state).unwrap_err(),
            CompileError::UnboundHavingReference {
                column: "score".to_string(),
                bound: vec!["status".to_string(), "total".to_string()],
            }
        );
    }

    #[test]
    fn test_unbound_aggregate_in_raw_having_rejected() {
        let state = grouped().having(Condition::raw("max(views) > 3"));
        assert!(matches!(
            compile(&state).unwrap_err(),
            CompileError::UnboundHavingReference { .. }
        ));
    }

    #[test]
    fn test_nested_aggregate_in_raw_having() {
        let state = QueryState::new("Post")
            .group_by("status")
            .select_raw("count(DISTINCT toLower(name)) AS c")
            .having(Condition::raw("count(DISTINCT toLower(name)) > 1"));
        assert_eq!(
            compile(&state).unwrap().cypher(),
            "MATCH (n:Post) WITH n.status AS status, count(DISTINCT toLower(n.name)) AS c \
             WHERE c > 1 RETURN status, c"
        );
    }

    #[test]
    fn test_unbound_nested_aggregate_rejected() {
        let state = grouped().having(Condition::raw("sum(size(tags)) > 3"));
        assert_eq!(
            compile(&state).unwrap_err(),
            CompileError::UnboundHavingReference {
                column: "sum(size(tags))".to_string(),
                bound: vec!["status".to_string(), "total".to_string()],
            }
        );
    }

    #[test]
    fn test_call_end_skips_quoted_parens() {
        assert_eq!(call_end("count(a)) > 1", 6), Some(8));
        assert_eq!(call_end("sum(x + ')') AS s", 4), Some(12));
        assert_eq!(call_end("max(size(x)", 4), None);
    }

    // =========================================================================
    // ORDER BY, pagination, fallback
    // =========================================================================

    #[test]
    fn test_order_by_bound_alias() {
        let state = grouped()
            .order_by("total", Direction::Desc)
            .order_by("n.status", Direction::Asc)
            .offset(5)
            .limit(10);
        assert_eq!(
            compile(&state).unwrap().cypher(),
            "MATCH (n:Post) WITH n.status AS status, count(*) AS total RETURN status, total \
             ORDER BY total DESC, status ASC SKIP 5 LIMIT 10"
        );
    }

    #[test]
    fn test_order_by_unbound_rejected() {
        let state = grouped().order_by("created_at", Direction::Desc);
        assert!(matches!(
            compile(&state).unwrap_err(),
            CompileError::UnboundOrderColumn { column, .. } if column == "created_at"
        ));
    }

    #[test]
    fn test_distinct_return() {
        let state = QueryState::new("Post").group_by("status").distinct();
        assert_eq!(
            compile(&state).unwrap().cypher(),
            "MATCH (n:Post) WITH n.status AS status RETURN DISTINCT status"
        );
    }

    #[test]
    fn test_nothing_to_bind_delegates_to_standard() {
        let state = QueryState::new("Post").where_basic("published", Operator::Eq, true);
        assert_eq!(
            compile(&state).unwrap().cypher(),
            "MATCH (n:Post) WHERE n.published = $published RETURN n"
        );
    }

    #[test]
    fn test_having_without_bindable_items_rejected() {
        let state = QueryState::new("Post").having(Condition::basic("total", Operator::Gt, 1));
        assert!(matches!(
            compile(&state).unwrap_err(),
            CompileError::UnboundHavingReference { .. }
        ));
    }
}
