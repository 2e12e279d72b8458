//! Config file loading
//!
//! Files are parsed into a format-neutral value tree, references are
//! resolved, then the tree is deserialized and validated.

use crate::components::{CompilerConfig, ConnectionConfig, LoggingConfig, RetryConfig};
use crate::error::{ConfigError, ConfigResult};
use crate::references::{file_reference_paths, resolve_references, resolve_references_with};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Query compiler settings
    pub compiler: CompilerConfig,
    /// Managed retry settings
    pub retry: RetryConfig,
    /// Driver connection settings
    pub connection: ConnectionConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Validate every section
    pub fn validate(&self) -> ConfigResult<()> {
        self.retry.validate()?;
        if self.compiler.default_alias.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "compiler.default_alias",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Supported config file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML
    Toml,
    /// YAML
    Yaml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }

    fn parse(self, content: &str) -> ConfigResult<Value> {
        let parse_err = |e: String| ConfigError::Parse {
            format: self.name(),
            error: e,
        };
        match self {
            #[cfg(feature = "toml")]
            Self::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
            #[cfg(not(feature = "toml"))]
            Self::Toml => Err(ConfigError::FormatDisabled("toml")),
            #[cfg(feature = "yaml")]
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| parse_err(e.to_string())),
            #[cfg(not(feature = "yaml"))]
            Self::Yaml => Err(ConfigError::FormatDisabled("yaml")),
            Self::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        }
    }
}

/// Loads [`BridgeConfig`] from files or strings
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load, resolve references, deserialize and validate a config file
    ///
    /// The config file and every `{file:...}` it references are read with
    /// `tokio::fs`.
    pub async fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<BridgeConfig> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut value = format.parse(&content)?;

        let mut files: HashMap<PathBuf, io::Result<String>> = HashMap::new();
        for reference in file_reference_paths(&value, base_dir) {
            let read = tokio::fs::read_to_string(&reference).await;
            files.insert(reference, read);
        }
        let resolved = resolve_references_with(&mut value, base_dir, |file| match files.get(file) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(e)) => Err(io::Error::new(e.kind(), e.to_string())),
            None => Err(io::Error::from(io::ErrorKind::NotFound)),
        });

        let config = Self::finish(value, resolved, format)?;
        info!(path = %path.display(), "Loaded cypherbridge config");
        Ok(config)
    }

    /// Parse config text; relative `{file:...}` references resolve against
    /// the current directory
    pub fn from_str(content: &str, format: ConfigFormat) -> ConfigResult<BridgeConfig> {
        let mut value = format.parse(content)?;
        let resolved = resolve_references(&mut value, Path::new("."));
        Self::finish(value, resolved, format)
    }

    fn finish(
        value: Value,
        resolved: Result<(), Vec<ConfigError>>,
        format: ConfigFormat,
    ) -> ConfigResult<BridgeConfig> {
        if let Err(mut errors) = resolved {
            debug!("{} unresolved config references", errors.len());
            // Report the first failure; the resolver logs each one
            return Err(errors.remove(0));
        }

        let config: BridgeConfig = serde_json::from_value(value).map_err(|e| ConfigError::Parse {
            format: format.name(),
            error: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}
