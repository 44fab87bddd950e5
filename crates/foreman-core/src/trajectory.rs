//! Append-only trajectory of a run.
//!
//! A trajectory interleaves the coordinator's dispatch decisions with the steps each worker
//! reports from its own sub-run. Steps are only ever appended; worker steps are spliced in as
//! a block, in the order the worker reported them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One recorded step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryStep {
    /// What was done (for dispatch decisions, the raw invocation)
    pub action: String,
    /// What was seen before or while acting
    #[serde(default)]
    pub observation: Option<String>,
    /// Raw model response, if any
    #[serde(default)]
    pub response: Option<String>,
    /// Environment state snapshot, if any
    #[serde(default)]
    pub state: Option<String>,
    /// Reasoning recorded for the step, if any
    #[serde(default)]
    pub thought: Option<String>,
    /// Wall-clock seconds spent on the step
    #[serde(default)]
    pub execution_time: f64,
}

impl TrajectoryStep {
    /// Create a step with only an action.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            observation: None,
            response: None,
            state: None,
            thought: None,
            execution_time: 0.0,
        }
    }

    pub fn with_observation(mut self, observation: impl Into<String>) -> Self {
        self.observation = Some(observation.into());
        self
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = Some(thought.into());
        self
    }

    pub fn with_execution_time(mut self, elapsed: Duration) -> Self {
        self.execution_time = elapsed.as_secs_f64();
        self
    }

    /// Copy of the step with its timing zeroed, for comparing runs.
    pub fn without_timing(&self) -> Self {
        Self {
            execution_time: 0.0,
            ..self.clone()
        }
    }
}

/// Ordered, append-only list of trajectory steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrajectoryLog {
    steps: Vec<TrajectoryStep>,
}

impl TrajectoryLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single step.
    pub fn push(&mut self, step: TrajectoryStep) {
        self.steps.push(step);
    }

    /// Append a block of steps, preserving their order.
    pub fn append(&mut self, steps: impl IntoIterator<Item = TrajectoryStep>) {
        self.steps.extend(steps);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[TrajectoryStep] {
        &self.steps
    }

    pub fn last(&self) -> Option<&TrajectoryStep> {
        self.steps.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrajectoryStep> {
        self.steps.iter()
    }

    pub fn into_steps(self) -> Vec<TrajectoryStep> {
        self.steps
    }

    /// Copy of the log with every step's timing zeroed.
    pub fn without_timing(&self) -> Self {
        Self {
            steps: self.steps.iter().map(TrajectoryStep::without_timing).collect(),
        }
    }
}

impl From<Vec<TrajectoryStep>> for TrajectoryLog {
    fn from(steps: Vec<TrajectoryStep>) -> Self {
        Self { steps }
    }
}

impl IntoIterator for TrajectoryLog {
    type Item = TrajectoryStep;
    type IntoIter = std::vec::IntoIter<TrajectoryStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

impl<'a> IntoIterator for &'a TrajectoryLog {
    type Item = &'a TrajectoryStep;
    type IntoIter = std::slice::Iter<'a, TrajectoryStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
