//! Logging component configuration

use serde::{Deserialize, Serialize};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for the cypherbridge crates
    pub level: String,
    /// Whether to include target/module
    pub include_target: bool,
    /// Whether to use ANSI colors
    pub ansi: bool,
    /// Extra filter directives such as `cypherbridge_exec=trace`
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            include_target: true,
            ansi: true,
            directives: Vec::new(),
        }
    }
}

impl LoggingConfig {
    /// Build an `EnvFilter`-compatible directive string
    pub fn filter_string(&self) -> String {
        let mut filter = format!(
            "warn,cypherbridge_query={level},cypherbridge_exec={level},cypherbridge_config={level}",
            level = self.level
        );
        for directive in &self.directives {
            filter.push(',');
            filter.push_str(directive);
        }
        filter
    }
}
