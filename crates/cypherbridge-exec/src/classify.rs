//! Database error classification.
//!
//! A closed set of classes decided by an ordered, case-insensitive substring
//! cascade over the error text. Rules are checked top to bottom and the first
//! hit wins: transient transaction markers carry the word "transaction" and
//! must be seen before the generic transaction rule.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Lock or deadlock contention
    Transient,
    /// Connectivity
    Network,
    Authentication,
    /// Invalid query text
    Query,
    /// Uniqueness or schema violation
    Constraint,
    /// Explicit rollback or termination
    Transaction,
    Unknown,
}

impl ErrorClass {
    pub const ALL: [ErrorClass; 7] = [
        ErrorClass::Transient,
        ErrorClass::Network,
        ErrorClass::Authentication,
        ErrorClass::Query,
        ErrorClass::Constraint,
        ErrorClass::Transaction,
        ErrorClass::Unknown,
    ];

    /// Only contention and connectivity failures are worth a bare retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClass::Transient | ErrorClass::Network)
    }

    pub fn remediation_hint(&self) -> &'static str {
        match self {
            ErrorClass::Transient => {
                "Temporary lock contention; the statement is safe to retry."
            }
            ErrorClass::Network => {
                "Check that the database is running and reachable at the configured URI."
            }
            ErrorClass::Authentication => {
                "Check the configured username and password; retrying with the same credentials will fail again."
            }
            ErrorClass::Query => {
                "The query text was rejected. If it came from the compiler, report it with the query and bindings."
            }
            ErrorClass::Constraint => {
                "A uniqueness or schema constraint was violated. Use MERGE instead of CREATE to upsert."
            }
            ErrorClass::Transaction => {
                "The transaction was rolled back or terminated. Re-run the whole unit of work, not just this statement."
            }
            ErrorClass::Unknown => "Unrecognized database error; inspect the original message.",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Transient => "transient",
            ErrorClass::Network => "network",
            ErrorClass::Authentication => "authentication",
            ErrorClass::Query => "query",
            ErrorClass::Constraint => "constraint",
            ErrorClass::Transaction => "transaction",
            ErrorClass::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered rule table. Patterns are lowercase.
const RULES: &[(ErrorClass, &[&str])] = &[
    (ErrorClass::Transient, &["neo.transienterror."]),
    (
        ErrorClass::Transient,
        &[
            "deadlock",
            "lock acquisition",
            "acquire lock",
            "lock wait",
            "lockclient",
            "read or write conflict",
        ],
    ),
    (
        ErrorClass::Authentication,
        &[
            "unauthorized",
            "unauthenticated",
            "authentication",
            "credentials",
            "neo.clienterror.security.",
            "access denied",
        ],
    ),
    (
        ErrorClass::Network,
        &[
            "connection refused",
            "connection reset",
            "connection closed",
            "connection aborted",
            "timed out",
            "timeout",
            "unreachable",
            "broken pipe",
            "service unavailable",
            "serviceunavailable",
            "failed to connect",
        ],
    ),
    (
        ErrorClass::Constraint,
        &["constraint", "already exists", "unique", "duplicate key"],
    ),
    (
        ErrorClass::Transaction,
        &["transaction", "rolled back", "rollback", "terminated"],
    ),
    (
        ErrorClass::Query,
        &[
            "syntax",
            "unknown function",
            "invalid input",
            "variable not defined",
            "type mismatch",
            "neo.clienterror.statement.",
        ],
    ),
];

/// Classify an error by its message text. Never fails.
pub fn classify<E: fmt::Display + ?Sized>(error: &E) -> ErrorClass {
    classify_message(&error.to_string())
}

pub fn classify_message(message: &str) -> ErrorClass {
    let message = message.to_lowercase();
    RULES
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| message.contains(p)))
        .map(|(class, _)| *class)
        .unwrap_or(ErrorClass::Unknown)
}

pub fn is_retryable(class: ErrorClass) -> bool {
    class.is_retryable()
}
