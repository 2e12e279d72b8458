//! Schema statement runner.
//!
//! Index and constraint DDL contends for schema locks, so statements are
//! submitted one at a time: each must complete before the next is issued.

use crate::driver::GraphDriver;
use crate::error::{wrap_error, ExecResult};
use crate::retry::with_managed_retry;
use cypherbridge_config::RetryConfig;
use cypherbridge_query::Bindings;
use tracing::info;

/// Apply `statements` in order, each under managed retry.
///
/// Stops at the first statement that fails for good and returns its error.
/// Blank statements are skipped. On success returns the number applied.
pub async fn apply_schema<S>(
    driver: &dyn GraphDriver,
    statements: &[S],
    retry: &RetryConfig,
) -> ExecResult<usize>
where
    S: AsRef<str> + Sync,
{
    let bindings = Bindings::new();
    let total = statements.len();
    let mut applied = 0;

    for (index, statement) in statements.iter().enumerate() {
        let cypher = statement.as_ref().trim();
        if cypher.is_empty() {
            continue;
        }
        info!("Applying schema statement {}/{}: {}", index + 1, total, cypher);

        let bindings = &bindings;
        with_managed_retry(
            move || async move {
                driver
                    .run(cypher, bindings)
                    .await
                    .map_err(|e| wrap_error(e, cypher, bindings))
            },
            retry,
        )
        .await?;
        applied += 1;
    }

    info!("Applied {} schema statements on {}", applied, driver.name());
    Ok(applied)
}
