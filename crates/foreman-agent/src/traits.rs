//! Collaborator interfaces.
//!
//! The coordinator talks to the outside world through three seams: the [`DecisionModel`]
//! that picks the next subtask, the [`Worker`]s that execute subtasks, and the
//! [`RunEnvironment`] that is told when the run is complete. The coordinator itself
//! implements [`Worker`], so coordinators nest.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::catalog::ToolCatalog;
use crate::error::{EnvironmentError, ModelError, WorkerError};
use crate::types::{DialogueTurn, ModelResponse, WorkerOutput, WorkerRequest};

/// The reasoning collaborator that decides what happens next.
#[async_trait]
pub trait DecisionModel: Send + Sync {
    /// Produce exactly one response turn for the conversation so far.
    async fn decide(
        &self,
        turns: &[DialogueTurn],
        catalog: &ToolCatalog,
    ) -> Result<ModelResponse, ModelError>;

    /// Name of the underlying model, for logs.
    fn model_name(&self) -> &str;
}

/// A collaborator that executes one subtask end-to-end.
#[async_trait]
pub trait Worker: Send + Sync {
    async fn run(&self, request: WorkerRequest) -> Result<WorkerOutput, WorkerError>;
}

/// The environment a run operates on.
#[async_trait]
pub trait RunEnvironment: Send + Sync {
    /// Tell the environment the run is complete and collect its terminal report.
    async fn signal_completion(&self, token: &str) -> Result<Map<String, Value>, EnvironmentError>;
}

#[async_trait]
impl<T: DecisionModel + ?Sized> DecisionModel for Arc<T> {
    async fn decide(
        &self,
        turns: &[DialogueTurn],
        catalog: &ToolCatalog,
    ) -> Result<ModelResponse, ModelError> {
        (**self).decide(turns, catalog).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

#[async_trait]
impl<T: Worker + ?Sized> Worker for Arc<T> {
    async fn run(&self, request: WorkerRequest) -> Result<WorkerOutput, WorkerError> {
        (**self).run(request).await
    }
}

#[async_trait]
impl<T: RunEnvironment + ?Sized> RunEnvironment for Arc<T> {
    async fn signal_completion(&self, token: &str) -> Result<Map<String, Value>, EnvironmentError> {
        (**self).signal_completion(token).await
    }
}

/// An environment with nothing to report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEnvironment;

#[async_trait]
impl RunEnvironment for NullEnvironment {
    async fn signal_completion(&self, _token: &str) -> Result<Map<String, Value>, EnvironmentError> {
        Ok(Map::new())
    }
}
