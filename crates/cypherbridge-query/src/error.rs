//! Compiler error types.
//!
//! These are programming errors in the query state, not data errors: the
//! compiler refuses to emit text it knows would be wrong.

use thiserror::Error;

/// Errors raised while compiling a query state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("aggregate column `{expression}` has no AS alias and cannot be referenced after WITH")]
    UnaliasedAggregate { expression: String },

    #[error("HAVING references `{column}`, which is not bound in the WITH clause (bound: {bound:?})")]
    UnboundHavingReference { column: String, bound: Vec<String> },

    #[error("ORDER BY references `{column}`, which is not bound in the WITH clause (bound: {bound:?})")]
    UnboundOrderColumn { column: String, bound: Vec<String> },

    #[error("operator `{operator}` cannot compare a relation count")]
    InvalidCountOperator { operator: String },

    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    #[error("match target label must not be empty")]
    EmptyLabel,

    #[error("no attributes to write for `{label}`")]
    EmptyWrite { label: String },
}

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;
