//! # Mock Workers
//!
//! Workers with canned output that record how they were invoked. A shared [`CallLog`] lets a
//! test observe the start/end interleaving of several workers.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use foreman_agent::{Subtask, Worker, WorkerError, WorkerInfo, WorkerOutput, WorkerRequest};
use foreman_core::{TrajectoryStep, UsageStats};

/// Ordered record of worker start/end events shared between workers.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    /// Events in the order they happened
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

/// A worker returning a fixed summary, trajectory and stats.
#[derive(Debug, Clone)]
pub struct MockWorker {
    name: String,
    summary: String,
    steps: Vec<TrajectoryStep>,
    stats: UsageStats,
    extra: Map<String, Value>,
    delay: Option<Duration>,
    failure: Option<String>,
    log: Option<CallLog>,
    requests: Arc<Mutex<Vec<WorkerRequest>>>,
}

impl MockWorker {
    /// Create a mock worker; the name is used in summaries and log events
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            summary: format!("{} finished its subtask", name),
            name,
            steps: Vec::new(),
            stats: UsageStats::default(),
            extra: Map::new(),
            delay: None,
            failure: None,
            log: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the summary returned on success
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Append a trajectory step with the given action
    pub fn with_step(mut self, action: impl Into<String>) -> Self {
        self.steps.push(TrajectoryStep::new(action));
        self
    }

    /// Replace the whole trajectory
    pub fn with_steps(mut self, steps: Vec<TrajectoryStep>) -> Self {
        self.steps = steps;
        self
    }

    /// Set the usage this worker reports for one run
    pub fn with_stats(mut self, stats: UsageStats) -> Self {
        self.stats = stats;
        self
    }

    /// Report a cost of `cost` over `calls` model calls
    pub fn with_cost(self, calls: u64, cost: f64) -> Self {
        self.with_stats(UsageStats {
            calls,
            cost_delta: cost,
            cost_total: cost,
            ..UsageStats::default()
        })
    }

    /// Add an extra field to the reported info
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Sleep before returning
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every run with this message
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Record start/end events in a shared log
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of times this worker ran
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request this worker received
    pub fn requests(&self) -> Vec<WorkerRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Cost baselines seen at each dispatch
    pub fn baselines(&self) -> Vec<UsageStats> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.cost_baseline)
            .collect()
    }

    /// Subtasks this worker was dispatched with
    pub fn subtasks(&self) -> Vec<Subtask> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(WorkerRequest::subtask)
            .collect()
    }

    fn record(&self, event: &str) {
        if let Some(log) = &self.log {
            log.record(format!("{}:{}", event, self.name));
        }
    }
}

#[async_trait]
impl Worker for MockWorker {
    async fn run(&self, request: WorkerRequest) -> Result<WorkerOutput, WorkerError> {
        self.record("start");
        self.requests.lock().unwrap().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.record("end");

        if let Some(message) = &self.failure {
            return Err(WorkerError::Failed(message.clone()));
        }

        Ok(WorkerOutput {
            info: WorkerInfo {
                stats: self.stats,
                extra: self.extra.clone(),
            },
            trajectory: self.steps.clone(),
            summary: self.summary.clone(),
        })
    }
}
