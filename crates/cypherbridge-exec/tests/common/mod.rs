//! Scripted in-memory driver shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use cypherbridge_config::ConnectionConfig;
use cypherbridge_exec::{
    Capability, DriverError, DriverFactory, GraphDriver, GraphTransaction, ProbeError, RowSet,
};
use cypherbridge_query::Bindings;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

type Scripted = Result<RowSet, DriverError>;

/// Replays scripted responses in order; once the script runs out every call
/// succeeds with an empty row set.
#[derive(Clone, Default)]
pub struct MockDriver {
    responses: Arc<Mutex<VecDeque<Scripted>>>,
    calls: Arc<Mutex<Vec<(String, Bindings)>>>,
    events: Arc<Mutex<Vec<String>>>,
    capabilities: Vec<Capability>,
    fail_commit: bool,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: Scripted) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.respond(Err(DriverError::new(message)))
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    pub fn calls(&self) -> Vec<(String, Bindings)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls().into_iter().map(|(cypher, _)| cypher).collect()
    }

    /// Transaction lifecycle, e.g. `["begin", "run MATCH ...", "commit"]`
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphDriver for MockDriver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(&self, cypher: &str, bindings: &Bindings) -> Result<RowSet, DriverError> {
        self.calls
            .lock()
            .unwrap()
            .push((cypher.to_string(), bindings.clone()));
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(RowSet::empty()))
    }

    async fn begin_transaction(&self) -> Result<Box<dyn GraphTransaction>, DriverError> {
        self.events.lock().unwrap().push("begin".to_string());
        Ok(Box::new(MockTransaction {
            events: self.events.clone(),
            fail_commit: self.fail_commit,
        }))
    }

    async fn probe(&self, capability: Capability) -> Result<bool, ProbeError> {
        if capability == Capability::MultiDatabase {
            return Err(ProbeError::Unsupported(capability));
        }
        Ok(self.capabilities.contains(&capability))
    }
}

/// Statements containing `INVALID` fail with a syntax error.
pub struct MockTransaction {
    events: Arc<Mutex<Vec<String>>>,
    fail_commit: bool,
}

#[async_trait]
impl GraphTransaction for MockTransaction {
    async fn run(&mut self, cypher: &str, _bindings: &Bindings) -> Result<RowSet, DriverError> {
        self.events.lock().unwrap().push(format!("run {}", cypher));
        if cypher.contains("INVALID") {
            return Err(DriverError::with_code(
                "Neo.ClientError.Statement.SyntaxError",
                "Invalid input 'INVALID'",
            ));
        }
        Ok(RowSet::empty())
    }

    async fn commit(self: Box<Self>) -> Result<(), DriverError> {
        self.events.lock().unwrap().push("commit".to_string());
        if self.fail_commit {
            return Err(DriverError::new("Transaction was terminated"));
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DriverError> {
        self.events.lock().unwrap().push("rollback".to_string());
        Ok(())
    }

    fn is_open(&self) -> bool {
        true
    }
}

/// Factory handing out clones of one mock driver.
pub struct MockFactory {
    pub driver: MockDriver,
}

#[async_trait]
impl DriverFactory for MockFactory {
    fn name(&self) -> &str {
        "mock"
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn GraphDriver>, DriverError> {
        if config.uri.contains("unreachable") {
            return Err(DriverError::new("Connection refused"));
        }
        Ok(Arc::new(self.driver.clone()))
    }
}
