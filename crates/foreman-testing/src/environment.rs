//! Stub run environment.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};

use foreman_agent::{EnvironmentError, RunEnvironment};

/// An environment that answers every completion signal with a fixed report.
#[derive(Debug, Clone, Default)]
pub struct StubEnvironment {
    report: Map<String, Value>,
    failure: Option<String>,
    signals: Arc<Mutex<Vec<String>>>,
}

impl StubEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field to the terminal report
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.report.insert(key.into(), value);
        self
    }

    /// Reject every completion signal
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Tokens received, in order
    pub fn signals(&self) -> Vec<String> {
        self.signals.lock().unwrap().clone()
    }

    pub fn signal_count(&self) -> usize {
        self.signals.lock().unwrap().len()
    }
}

#[async_trait]
impl RunEnvironment for StubEnvironment {
    async fn signal_completion(&self, token: &str) -> Result<Map<String, Value>, EnvironmentError> {
        self.signals.lock().unwrap().push(token.to_string());
        match &self.failure {
            Some(message) => Err(EnvironmentError::new(message.clone())),
            None => Ok(self.report.clone()),
        }
    }
}
