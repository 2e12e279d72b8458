//! Write statements: CREATE, SET, DELETE.
//!
//! Update and delete reuse the read-side MATCH/WHERE pipeline so the same
//! filters select the nodes being written.

use crate::clause::{assemble, ClauseBuilder};
use crate::compiled::{Bindings, CompiledQuery};
use crate::error::{CompileError, CompileResult};
use crate::state::QueryState;
use crate::strategy::{match_section, AliasMap};
use cypherbridge_config::CompilerConfig;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct WriteCompiler {
    config: CompilerConfig,
    clauses: ClauseBuilder,
}

impl WriteCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        let clauses = ClauseBuilder::from_config(&config);
        Self { config, clauses }
    }

    /// `CREATE (n:Label {...}) RETURN n`
    pub fn insert(&self, label: &str, attributes: &[(String, Value)]) -> CompileResult<CompiledQuery> {
        if label.trim().is_empty() {
            return Err(CompileError::EmptyLabel);
        }
        let alias = self.config.default_alias.as_str();
        let mut bindings = Bindings::new();
        let create = self.clauses.build_create(label, attributes, alias, &mut bindings);
        let compiled = CompiledQuery::new(assemble([create, format!("RETURN {}", alias)]), bindings);
        debug!("compiled insert: {}", compiled.cypher());
        Ok(compiled)
    }

    /// `MATCH ... WHERE ... SET ... RETURN n`
    pub fn update(&self, state: &QueryState, values: &[(String, Value)]) -> CompileResult<CompiledQuery> {
        if values.is_empty() {
            return Err(CompileError::EmptyWrite {
                label: state.target.label.clone(),
            });
        }
        let alias = state.alias_or(&self.config.default_alias);
        let aliases = AliasMap::new(state, alias);
        let mut bindings = Bindings::new();

        let mut clauses = match_section(state, &aliases, &self.clauses, &mut bindings)?;
        clauses.push(self.clauses.build_set(values, alias, &mut bindings));
        clauses.push(format!("RETURN {}", alias));

        let compiled = CompiledQuery::new(assemble(clauses), bindings);
        debug!("compiled update: {}", compiled.cypher());
        Ok(compiled)
    }

    /// `MATCH ... WHERE ... [DETACH] DELETE n`
    pub fn delete(&self, state: &QueryState, detach: bool) -> CompileResult<CompiledQuery> {
        let alias = state.alias_or(&self.config.default_alias);
        let aliases = AliasMap::new(state, alias);
        let mut bindings = Bindings::new();

        let mut clauses = match_section(state, &aliases, &self.clauses, &mut bindings)?;
        clauses.push(ClauseBuilder::build_delete(alias, detach));

        let compiled = CompiledQuery::new(assemble(clauses), bindings);
        debug!("compiled delete: {}", compiled.cypher());
        Ok(compiled)
    }
}

pub fn compile_insert(label: &str, attributes: &[(String, Value)]) -> CompileResult<CompiledQuery> {
    WriteCompiler::default().insert(label, attributes)
}

pub fn compile_update(state: &QueryState, values: &[(String, Value)]) -> CompileResult<CompiledQuery> {
    WriteCompiler::default().update(state, values)
}

/// Delete matching nodes. Pass `detach: true` unless the nodes are known to
/// have no relationships.
pub fn compile_delete(state: &QueryState, detach: bool) -> CompileResult<CompiledQuery> {
    WriteCompiler::default().delete(state, detach)
}
