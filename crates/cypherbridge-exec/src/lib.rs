//! Execution resilience for compiled Cypher queries.
//!
//! Driver failures are classified into a closed set of [`ErrorClass`]es and
//! wrapped once, at the driver seam, into a typed [`GraphError`]. Transient
//! and network failures are retried with exponential backoff by
//! [`with_managed_retry`]; everything else propagates on the first attempt.
//!
//! The transport is not part of this crate. Implement [`GraphDriver`] (and a
//! [`DriverFactory`] for [`DriverRegistry`]) and hand it to a
//! [`GraphExecutor`]:
//!
//! ```rust,ignore
//! let registry = DriverRegistry::new().with_factory(Arc::new(BoltFactory));
//! let executor = GraphExecutor::connect(&registry, &config).await?;
//! let rows = executor.fetch(&QueryState::new("Post").limit(10)).await?;
//! ```

pub mod backoff;
pub mod classify;
pub mod driver;
pub mod error;
pub mod executor;
pub mod logging;
pub mod retry;
pub mod row;
pub mod schema;

pub use backoff::{delay_for, delay_ms};
pub use classify::{classify, classify_message, is_retryable, ErrorClass};
pub use driver::{
    Capability, DriverFactory, DriverRegistry, GraphDriver, GraphTransaction, ProbeError,
};
pub use error::{wrap_error, DriverError, ExecResult, Failure, GraphError};
pub use executor::{GraphExecutor, Transaction};
pub use logging::init_logging;
pub use retry::{with_managed_retry, with_managed_retry_cancellable};
pub use row::{Cast, RawRecord, Row, RowError, RowSet};
pub use schema::apply_schema;
