//! Connection component configuration

use serde::{Deserialize, Serialize};

/// Driver connection settings
///
/// `password` usually arrives through an `{env:VAR}` reference so secrets
/// stay out of the file.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Name of the registered driver factory
    pub driver: String,
    /// Server URI
    pub uri: String,
    /// Login name
    pub username: Option<String>,
    /// Login secret
    pub password: Option<String>,
    /// Target database, `None` for the server default
    pub database: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            driver: "bolt".to_string(),
            uri: "bolt://localhost:7687".to_string(),
            username: None,
            password: None,
            database: None,
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let config = ConnectionConfig {
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }
}
