//! Standard strategy: queries without grouping.
//!
//! MATCH -> WHERE -> OPTIONAL MATCH (left joins) -> [WITH * WHERE] -> RETURN -> ORDER BY -> SKIP/LIMIT

use super::{match_section, AliasMap, QueryStrategy};
use crate::clause::{assemble, property_ref, push_unique, return_clause, ClauseBuilder};
use crate::compiled::{Bindings, CompiledQuery};
use crate::error::CompileResult;
use crate::state::{Column, Order, QueryState};
use cypherbridge_config::CompilerConfig;

pub struct StandardStrategy {
    config: CompilerConfig,
    clauses: ClauseBuilder,
}

impl StandardStrategy {
    pub fn new(config: CompilerConfig) -> Self {
        let clauses = ClauseBuilder::from_config(&config);
        Self { config, clauses }
    }
}

impl Default for StandardStrategy {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

impl QueryStrategy for StandardStrategy {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn compile(&self, state: &QueryState) -> CompileResult<CompiledQuery> {
        let alias = state.alias_or(&self.config.default_alias);
        let aliases = AliasMap::new(state, alias);
        let mut bindings = Bindings::new();

        let mut clauses = match_section(state, &aliases, &self.clauses, &mut bindings)?;

        let columns: Vec<Column> = state
            .columns
            .iter()
            .map(|c| aliases.resolve_column(c))
            .collect();
        let orders: Vec<Order> = state.orders.iter().map(|o| aliases.resolve_order(o)).collect();

        // Ordered columns are always projected; under DISTINCT this is required.
        let mut items = self.clauses.return_items(&columns, alias);
        for order in &orders {
            if let Order::Column { column, .. } = order {
                push_unique(&mut items, property_ref(column, alias));
            }
        }

        clauses.push(return_clause(&items, state.distinct));
        clauses.push(self.clauses.build_order_by(&orders, alias));
        clauses.push(ClauseBuilder::build_limit(state.limit, state.offset));

        Ok(CompiledQuery::new(assemble(clauses), bindings))
    }
}
