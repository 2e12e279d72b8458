//! Compiler component configuration
//!
//! Settings consumed by the query compiler when turning a query state into
//! pattern-matching text.

use serde::{Deserialize, Serialize};

/// How `LIKE`/`NOT LIKE` conditions are translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeMode {
    /// Pick the operator from the wildcard layout of the bound value:
    /// `%x%` → `CONTAINS`, `x%` → `STARTS WITH`, `%x` → `ENDS WITH`,
    /// no wildcard → `CONTAINS`, anything else → `=~` with a translated regex.
    #[default]
    Auto,
    /// Always `CONTAINS`, with `%` wildcards stripped from the ends.
    Contains,
    /// Always `=~`, translating `%` and `_` into regex wildcards.
    Regex,
}

/// Compiler component configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Alias used for the primary node when the query state does not set one
    pub default_alias: String,
    /// LIKE translation rule
    pub like_mode: LikeMode,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_alias: "n".to_string(),
            like_mode: LikeMode::Auto,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiler_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.default_alias, "n");
        assert_eq!(config.like_mode, LikeMode::Auto);
    }

    #[test]
    fn test_like_mode_snake_case() {
        let config: CompilerConfig =
            serde_json::from_str(r#"{"like_mode": "regex"}"#).unwrap();
        assert_eq!(config.like_mode, LikeMode::Regex);
        assert_eq!(config.default_alias, "n");
    }
}
