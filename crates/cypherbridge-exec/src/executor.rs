//! Executor: compiled queries in, typed rows or typed errors out.

use crate::driver::{Capability, DriverRegistry, GraphDriver, GraphTransaction};
use crate::error::{wrap_error, ExecResult, GraphError};
use crate::retry::with_managed_retry_cancellable;
use crate::row::RowSet;
use crate::schema::apply_schema;
use cypherbridge_config::{BridgeConfig, CompilerConfig, RetryConfig};
use cypherbridge_query::{compile_with, CompiledQuery, QueryState, WriteCompiler};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Runs compiled queries against one driver with managed retry.
#[derive(Clone)]
pub struct GraphExecutor {
    driver: Arc<dyn GraphDriver>,
    retry: RetryConfig,
    compiler: CompilerConfig,
    cancel: CancellationToken,
}

impl GraphExecutor {
    pub fn new(driver: Arc<dyn GraphDriver>) -> Self {
        Self {
            driver,
            retry: RetryConfig::default(),
            compiler: CompilerConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Executor using the retry and compiler sections of `config`.
    pub fn from_config(driver: Arc<dyn GraphDriver>, config: &BridgeConfig) -> ExecResult<Self> {
        config.validate()?;
        Ok(Self::new(driver)
            .with_retry(config.retry.clone())
            .with_compiler(config.compiler.clone()))
    }

    /// Open a driver through `registry` and build an executor around it.
    pub async fn connect(registry: &DriverRegistry, config: &BridgeConfig) -> ExecResult<Self> {
        config.validate()?;
        let driver = registry.connect(&config.connection).await?;
        Self::from_config(driver, config)
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_compiler(mut self, compiler: CompilerConfig) -> Self {
        self.compiler = compiler;
        self
    }

    /// Stop retry loops (and pending backoff sleeps) when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn driver(&self) -> &Arc<dyn GraphDriver> {
        &self.driver
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// One attempt; driver errors are classified and wrapped here.
    pub async fn run(&self, query: &CompiledQuery) -> ExecResult<RowSet> {
        debug!("Running on {}: {}", self.driver.name(), query.cypher());
        self.driver
            .run(query.cypher(), query.bindings())
            .await
            .map_err(|e| wrap_error(e, query.cypher(), query.bindings()))
    }

    pub async fn run_with_retry(&self, query: &CompiledQuery) -> ExecResult<RowSet> {
        with_managed_retry_cancellable(|| self.run(query), &self.retry, &self.cancel).await
    }

    /// Compile `state` and run it with retry.
    pub async fn fetch(&self, state: &QueryState) -> ExecResult<RowSet> {
        let query = compile_with(state, &self.compiler)?;
        self.run_with_retry(&query).await
    }

    pub async fn fetch_as<T: DeserializeOwned>(&self, state: &QueryState) -> ExecResult<Vec<T>> {
        Ok(self.fetch(state).await?.deserialize()?)
    }

    pub async fn insert(&self, label: &str, attributes: &[(String, Value)]) -> ExecResult<RowSet> {
        let query = self.writer().insert(label, attributes)?;
        self.run_with_retry(&query).await
    }

    pub async fn update(&self, state: &QueryState, values: &[(String, Value)]) -> ExecResult<RowSet> {
        let query = self.writer().update(state, values)?;
        self.run_with_retry(&query).await
    }

    pub async fn delete(&self, state: &QueryState, detach: bool) -> ExecResult<RowSet> {
        let query = self.writer().delete(state, detach)?;
        self.run_with_retry(&query).await
    }

    /// Run DDL statements one at a time, in order.
    pub async fn apply_schema<S: AsRef<str> + Sync>(&self, statements: &[S]) -> ExecResult<usize> {
        apply_schema(self.driver.as_ref(), statements, &self.retry).await
    }

    /// Check a backend capability. A driver that cannot tell is treated as
    /// lacking it.
    pub async fn supports(&self, capability: Capability) -> bool {
        match self.driver.probe(capability).await {
            Ok(supported) => supported,
            Err(e) => {
                debug!("Capability probe on {}: {}", self.driver.name(), e);
                false
            }
        }
    }

    /// Run `work` inside one transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// Statements inside are not retried individually; a failed unit of work
    /// has to be resubmitted as a whole by the caller.
    pub async fn run_in_transaction<T, F>(&self, work: F) -> ExecResult<T>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut Transaction) -> BoxFuture<'t, ExecResult<T>>,
    {
        let inner = self
            .driver
            .begin_transaction()
            .await
            .map_err(GraphError::from_driver)?;
        let mut tx = Transaction { inner };

        match work(&mut tx).await {
            Ok(value) => {
                tx.inner.commit().await.map_err(GraphError::from_driver)?;
                Ok(value)
            }
            Err(err) => {
                if tx.inner.is_open() {
                    if let Err(rollback) = tx.inner.rollback().await {
                        warn!("Rollback failed after error ({}): {}", err, rollback);
                    }
                }
                Err(err)
            }
        }
    }

    fn writer(&self) -> WriteCompiler {
        WriteCompiler::new(self.compiler.clone())
    }
}

impl std::fmt::Debug for GraphExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphExecutor")
            .field("driver", &self.driver.name())
            .field("retry", &self.retry)
            .field("compiler", &self.compiler)
            .finish()
    }
}

/// Transaction handle passed to [`GraphExecutor::run_in_transaction`].
pub struct Transaction {
    inner: Box<dyn GraphTransaction>,
}

impl Transaction {
    pub async fn run(&mut self, query: &CompiledQuery) -> ExecResult<RowSet> {
        debug!("Running in transaction: {}", query.cypher());
        self.inner
            .run(query.cypher(), query.bindings())
            .await
            .map_err(|e| wrap_error(e, query.cypher(), query.bindings()))
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }
}
