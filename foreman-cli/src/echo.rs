use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use foreman_agent::{RegistryError, Worker, WorkerError, WorkerOutput, WorkerRegistry, WorkerRequest};
use foreman_core::{TrajectoryStep, WorkerSettings};

/// Stand-in worker that reports its subtask back without doing anything.
pub struct EchoWorker {
    id: String,
}

impl EchoWorker {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl Worker for EchoWorker {
    async fn run(&self, request: WorkerRequest) -> Result<WorkerOutput, WorkerError> {
        let task = request
            .subtask()
            .map(|s| s.instructions)
            .or_else(|| request.goal().map(str::to_string))
            .unwrap_or_default();

        Ok(WorkerOutput {
            trajectory: vec![
                TrajectoryStep::new(format!("echo {}", task)).with_observation(&task),
            ],
            summary: format!("{}: completed '{}'", self.id, task),
            ..WorkerOutput::default()
        })
    }
}

/// Bind every configured worker to an [`EchoWorker`].
pub fn echo_registry(workers: &[WorkerSettings]) -> Result<WorkerRegistry, RegistryError> {
    let handles: HashMap<_, Arc<dyn Worker>> = workers
        .iter()
        .map(|w| {
            let handle: Arc<dyn Worker> = Arc::new(EchoWorker::new(w.id.as_str()));
            (w.id.clone(), handle)
        })
        .collect();
    WorkerRegistry::from_settings(workers, handles)
}
