//! # cypherbridge configuration
//!
//! Typed configuration for the query compiler, the managed-retry executor,
//! the driver connection and logging.
//!
//! ## Features
//!
//! - Multi-format support (TOML, YAML, JSON)
//! - `{env:VAR}` and `{file:path}` references resolved at load time
//! - Validation of retry bounds before anything runs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cypherbridge_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load_from_file("cypherbridge.toml").await?;
//!     println!("retrying up to {} times", config.retry.max_attempts);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod components;
mod error;
mod loader;
pub mod references;

pub use components::*;
pub use error::{ConfigError, ConfigResult};
pub use loader::{BridgeConfig, ConfigFormat, ConfigLoader};
