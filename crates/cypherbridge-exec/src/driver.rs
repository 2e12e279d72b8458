//! Driver boundary.
//!
//! The transport itself lives outside this crate. Implementations provide
//! [`GraphDriver`] (and a [`DriverFactory`] to build one from a
//! [`ConnectionConfig`]); everything above works against these traits.

use crate::error::{DriverError, ExecResult, GraphError};
use crate::row::RowSet;
use async_trait::async_trait;
use cypherbridge_config::ConnectionConfig;
use cypherbridge_query::Bindings;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Optional backend features a caller may need to check for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `EXISTS { ... }` subqueries
    ExistsSubqueries,
    /// Explicit multi-statement transactions
    Transactions,
    /// Uniqueness and existence constraints
    SchemaConstraints,
    /// Selecting a database per session
    MultiDatabase,
}

/// Failure of the probe itself, as opposed to the capability being absent.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("driver cannot probe for {0:?}")]
    Unsupported(Capability),

    #[error("probe for {capability:?} failed: {source}")]
    Failed {
        capability: Capability,
        #[source]
        source: DriverError,
    },
}

#[async_trait]
pub trait GraphDriver: Send + Sync {
    /// Driver name, as registered
    fn name(&self) -> &str;

    /// Run one statement outside any explicit transaction.
    async fn run(&self, cypher: &str, bindings: &Bindings) -> Result<RowSet, DriverError>;

    async fn begin_transaction(&self) -> Result<Box<dyn GraphTransaction>, DriverError>;

    /// `Ok(false)` means the backend lacks the capability.
    async fn probe(&self, capability: Capability) -> Result<bool, ProbeError> {
        Err(ProbeError::Unsupported(capability))
    }
}

/// An open transaction. Commit or roll back exactly once.
#[async_trait]
pub trait GraphTransaction: Send {
    async fn run(&mut self, cypher: &str, bindings: &Bindings) -> Result<RowSet, DriverError>;

    async fn commit(self: Box<Self>) -> Result<(), DriverError>;

    async fn rollback(self: Box<Self>) -> Result<(), DriverError>;

    fn is_open(&self) -> bool;
}

/// Builds a driver from connection settings.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Name matched against `ConnectionConfig::driver`
    fn name(&self) -> &str;

    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn GraphDriver>, DriverError>;
}

/// Explicit registry of driver factories. Build one at startup and pass it
/// to whatever needs to open connections.
#[derive(Default)]
pub struct DriverRegistry {
    factories: HashMap<String, Arc<dyn DriverFactory>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; returns the one previously registered under the same name.
    pub fn register(&mut self, factory: Arc<dyn DriverFactory>) -> Option<Arc<dyn DriverFactory>> {
        let name = factory.name().to_string();
        debug!("Registering driver factory: {}", name);
        self.factories.insert(name, factory)
    }

    pub fn with_factory(mut self, factory: Arc<dyn DriverFactory>) -> Self {
        self.register(factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Connect with the factory named by `config.driver`.
    pub async fn connect(&self, config: &ConnectionConfig) -> ExecResult<Arc<dyn GraphDriver>> {
        let factory = self
            .factories
            .get(&config.driver)
            .ok_or_else(|| GraphError::UnknownDriver(config.driver.clone()))?;
        info!("Connecting with driver '{}' to {}", config.driver, config.uri);
        factory.connect(config).await.map_err(GraphError::from_driver)
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("factories", &self.names())
            .finish()
    }
}
