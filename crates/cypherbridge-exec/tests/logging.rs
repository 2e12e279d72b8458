//! Installs the process-wide subscriber, so it lives in its own test binary.

use cypherbridge_config::LoggingConfig;
use cypherbridge_exec::init_logging;

#[test]
fn test_init_logging_is_idempotent() {
    let config = LoggingConfig::default();
    init_logging(&config);
    init_logging(&config);
    tracing::info!("still logging");
}
