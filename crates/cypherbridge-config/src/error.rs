//! Error types for configuration loading and validation

use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("IO error reading {path}: {error}")]
    Io {
        /// Path to the file
        path: PathBuf,
        /// Error message
        error: String,
    },

    /// Config text could not be parsed in the detected format
    #[error("Parse error ({format}): {error}")]
    Parse {
        /// Format name
        format: &'static str,
        /// Error message
        error: String,
    },

    /// File extension does not map to a known format
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// Format support was compiled out
    #[error("Config format '{0}' is not enabled in this build")]
    FormatDisabled(&'static str),

    /// `{file:path}` reference points at a missing file
    #[error("Referenced file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// `{env:VAR}` reference names an unset variable
    #[error("Environment variable not found: {var_name} (referenced as {{env:{var_name}}})")]
    EnvVarNotFound {
        /// Name of the environment variable
        var_name: String,
    },

    /// A value is outside its allowed range
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Dotted field path
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
