//! Execution error types.
//!
//! Raw driver failures are classified and wrapped exactly once, where the
//! driver call returns. Above that boundary only [`GraphError`] is visible.

use crate::classify::{classify, ErrorClass};
use crate::row::RowError;
use cypherbridge_config::ConfigError;
use cypherbridge_query::{Bindings, CompileError};
use std::fmt;
use thiserror::Error;

/// Error reported by a driver implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    /// Backend status code, e.g. `Neo.ClientError.Schema.ConstraintValidationFailed`
    pub code: Option<String>,
    pub message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DriverError {}

/// Diagnostics attached to a classified failure.
#[derive(Debug, Clone)]
pub struct Failure {
    pub message: String,
    pub cypher: Option<String>,
    pub bindings: Option<Bindings>,
    pub hint: &'static str,
    pub attempts: u32,
    pub source: Option<DriverError>,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if self.attempts > 1 {
            write!(f, " (after {} attempts)", self.attempts)?;
        }
        write!(f, ". Hint: {}", self.hint)
    }
}

/// Typed execution error. One variant per [`ErrorClass`].
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("transient database error: {0}")]
    Transient(Box<Failure>),

    #[error("database unreachable: {0}")]
    Network(Box<Failure>),

    #[error("authentication failed: {0}")]
    Authentication(Box<Failure>),

    #[error("query rejected: {0}")]
    Query(Box<Failure>),

    #[error("constraint violation: {0}")]
    Constraint(Box<Failure>),

    #[error("transaction failed: {0}")]
    Transaction(Box<Failure>),

    #[error("database error: {0}")]
    Unknown(Box<Failure>),

    #[error("operation cancelled before attempt {attempt}")]
    Cancelled { attempt: u32 },

    #[error("no driver registered under `{0}`")]
    UnknownDriver(String),

    #[error("failed to compile query: {0}")]
    Compile(#[from] CompileError),

    #[error("failed to decode rows: {0}")]
    Row(#[from] RowError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl GraphError {
    /// Build the variant matching `class`.
    pub fn classified(class: ErrorClass, failure: Failure) -> Self {
        let failure = Box::new(failure);
        match class {
            ErrorClass::Transient => GraphError::Transient(failure),
            ErrorClass::Network => GraphError::Network(failure),
            ErrorClass::Authentication => GraphError::Authentication(failure),
            ErrorClass::Query => GraphError::Query(failure),
            ErrorClass::Constraint => GraphError::Constraint(failure),
            ErrorClass::Transaction => GraphError::Transaction(failure),
            ErrorClass::Unknown => GraphError::Unknown(failure),
        }
    }

    /// Classify a driver error that has no query attached (connect, begin, commit).
    pub fn from_driver(error: DriverError) -> Self {
        wrap(error, None, None)
    }

    pub fn class(&self) -> Option<ErrorClass> {
        Some(match self {
            GraphError::Transient(_) => ErrorClass::Transient,
            GraphError::Network(_) => ErrorClass::Network,
            GraphError::Authentication(_) => ErrorClass::Authentication,
            GraphError::Query(_) => ErrorClass::Query,
            GraphError::Constraint(_) => ErrorClass::Constraint,
            GraphError::Transaction(_) => ErrorClass::Transaction,
            GraphError::Unknown(_) => ErrorClass::Unknown,
            _ => return None,
        })
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            GraphError::Transient(f)
            | GraphError::Network(f)
            | GraphError::Authentication(f)
            | GraphError::Query(f)
            | GraphError::Constraint(f)
            | GraphError::Transaction(f)
            | GraphError::Unknown(f) => Some(f),
            _ => None,
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        self.failure().map(|f| f.hint)
    }

    /// Attempts made before this error surfaced; 0 when not applicable.
    pub fn attempts(&self) -> u32 {
        match self {
            GraphError::Cancelled { attempt } => attempt.saturating_sub(1),
            other => other.failure().map(|f| f.attempts).unwrap_or(0),
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        match &mut self {
            GraphError::Transient(f)
            | GraphError::Network(f)
            | GraphError::Authentication(f)
            | GraphError::Query(f)
            | GraphError::Constraint(f)
            | GraphError::Transaction(f)
            | GraphError::Unknown(f) => f.attempts = attempts,
            _ => {}
        }
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.class().is_some_and(|c| c.is_retryable())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GraphError::Cancelled { .. })
    }
}

fn wrap(error: DriverError, cypher: Option<&str>, bindings: Option<&Bindings>) -> GraphError {
    let class = classify(&error);
    GraphError::classified(
        class,
        Failure {
            message: error.to_string(),
            cypher: cypher.map(str::to_string),
            bindings: bindings.cloned(),
            hint: class.remediation_hint(),
            attempts: 1,
            source: Some(error),
        },
    )
}

/// Classify a driver error and attach the query it came from.
pub fn wrap_error(error: DriverError, cypher: &str, bindings: &Bindings) -> GraphError {
    wrap(error, Some(cypher), Some(bindings))
}

/// Result type for execution.
pub type ExecResult<T> = Result<T, GraphError>;
