//! Logging setup.
//!
//! Library code only emits `tracing` events; hosts that want them on stderr
//! call [`init_logging`] once at startup.

use cypherbridge_config::LoggingConfig;
use std::sync::Once;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Static initialization guard
static INIT: Once = Once::new();

/// Install a fmt subscriber filtered by `config`.
///
/// `RUST_LOG` wins over the configured level when set. Later calls are
/// no-ops, as is the first call when another subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) {
    let mut installed = false;
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.filter_string()));

        installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(config.include_target)
            .with_ansi(config.ansi)
            .try_init()
            .is_ok();
    });

    if installed {
        info!("Logging initialized with filter: {}", config.filter_string());
    } else {
        debug!("Logging already initialized");
    }
}

