//! Dialogue, dispatch and run types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use foreman_core::{ModelUsage, TrajectoryLog, TrajectoryStep, UsageStats, WorkerId};

use crate::traits::RunEnvironment;

/// Free-form key/value context handed to a run and forwarded to its workers.
pub type SetupContext = Map<String, Value>;

/// Setup-context key holding the goal text.
pub const GOAL_KEY: &str = "goal";

/// Setup-context key holding the structured subtask a worker was dispatched with.
pub const SUBTASK_KEY: &str = "subtask";

/// Role of a dialogue turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Coordinator instructions
    System,
    /// Decision model output
    Assistant,
    /// Worker summary answering an invocation
    ToolResult,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::Assistant => write!(f, "assistant"),
            Role::ToolResult => write!(f, "tool-result"),
        }
    }
}

/// A structured action invocation emitted by the decision model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Provider-assigned id, echoed back on the matching tool-result turn
    pub id: String,
    /// Name of the invoked action
    pub name: String,
    /// Raw arguments as emitted by the model
    pub arguments: Value,
}

impl ToolInvocation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Render the invocation the way it is recorded in the trajectory.
    pub fn to_action_string(&self) -> String {
        format!("{}({})", self.name, self.arguments)
    }
}

/// One message of the coordinator's conversation with the decision model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub role: Role,
    pub content: String,
    /// Invocations carried by an assistant turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,
    /// Invocation a tool-result turn answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl DialogueTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolInvocation>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::ToolResult,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Why the decision model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model emitted structured invocations
    ToolCalls,
    /// The model finished a free-text answer
    Stop,
    /// Any other provider-specific reason (length, content filter, ...)
    #[serde(untagged)]
    Other(String),
}

impl FinishReason {
    /// Parse a provider finish reason string.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "tool_calls" | "function_call" => FinishReason::ToolCalls,
            "stop" => FinishReason::Stop,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// One response turn from the decision model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Free-text commentary
    #[serde(default)]
    pub content: String,
    pub finish_reason: FinishReason,
    #[serde(default)]
    pub tool_calls: Vec<ToolInvocation>,
    #[serde(default)]
    pub usage: ModelUsage,
}

impl ModelResponse {
    /// A free-text response that stopped normally.
    pub fn stop(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finish_reason: FinishReason::Stop,
            tool_calls: Vec::new(),
            usage: ModelUsage::default(),
        }
    }

    /// A response carrying structured invocations.
    pub fn tool_calls(content: impl Into<String>, tool_calls: Vec<ToolInvocation>) -> Self {
        Self {
            content: content.into(),
            finish_reason: FinishReason::ToolCalls,
            tool_calls,
            usage: ModelUsage::default(),
        }
    }

    pub fn with_usage(mut self, usage: ModelUsage) -> Self {
        self.usage = usage;
        self
    }
}

/// A concrete unit of work derived from one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub target_worker: WorkerId,
    pub instructions: String,
    pub current_status: String,
    pub definition_of_done: String,
}

impl Subtask {
    /// Render the subtask as the goal text handed to the worker.
    pub fn render(&self) -> String {
        format!(
            "Task: {}\n\nCurrent status: {}\n\nDefinition of done: {}",
            self.instructions, self.current_status, self.definition_of_done
        )
    }
}

/// What the caller wants back from a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    /// Stats and full trajectory
    #[default]
    InfoTrajectory,
    /// Stats and trajectory plus a condensed textual summary
    Summary,
}

/// Input to a worker invocation.
#[derive(Clone)]
pub struct WorkerRequest {
    pub setup_context: SetupContext,
    pub environment: Arc<dyn RunEnvironment>,
    pub observation: Option<String>,
    pub trajectory_dir: Option<PathBuf>,
    pub return_type: ReturnType,
    /// Accumulated stats of the dispatching run at the moment of dispatch
    pub cost_baseline: UsageStats,
}

impl WorkerRequest {
    /// The subtask this request was dispatched for, if present in the setup context.
    pub fn subtask(&self) -> Option<Subtask> {
        self.setup_context
            .get(SUBTASK_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// The goal text handed to the worker.
    pub fn goal(&self) -> Option<&str> {
        self.setup_context.get(GOAL_KEY).and_then(Value::as_str)
    }
}

impl fmt::Debug for WorkerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRequest")
            .field("setup_context", &self.setup_context)
            .field("observation", &self.observation)
            .field("trajectory_dir", &self.trajectory_dir)
            .field("return_type", &self.return_type)
            .field("cost_baseline", &self.cost_baseline)
            .finish_non_exhaustive()
    }
}

/// Run information reported by a worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerInfo {
    /// Usage incurred by this worker run alone
    pub stats: UsageStats,
    /// Anything else the worker chose to report
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What a worker hands back to the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerOutput {
    pub info: WorkerInfo,
    pub trajectory: Vec<TrajectoryStep>,
    pub summary: String,
}

/// Caller-facing input to a coordinator run.
#[derive(Clone)]
pub struct RunRequest {
    pub setup_context: SetupContext,
    pub environment: Arc<dyn RunEnvironment>,
    pub observation: Option<String>,
    pub trajectory_dir: Option<PathBuf>,
    pub return_type: ReturnType,
    pub init_stats: Option<UsageStats>,
}

impl RunRequest {
    /// Create a request against the given environment.
    pub fn new(environment: Arc<dyn RunEnvironment>) -> Self {
        Self {
            setup_context: SetupContext::new(),
            environment,
            observation: None,
            trajectory_dir: None,
            return_type: ReturnType::default(),
            init_stats: None,
        }
    }

    /// Set the goal in the setup context.
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.setup_context
            .insert(GOAL_KEY.to_string(), Value::String(goal.into()));
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.setup_context.insert(key.into(), value);
        self
    }

    pub fn with_observation(mut self, observation: impl Into<String>) -> Self {
        self.observation = Some(observation.into());
        self
    }

    pub fn with_trajectory_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.trajectory_dir = Some(dir.into());
        self
    }

    pub fn with_return_type(mut self, return_type: ReturnType) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn with_init_stats(mut self, stats: UsageStats) -> Self {
        self.init_stats = Some(stats);
        self
    }

    /// The goal: the `goal` context entry, falling back to the observation.
    pub fn goal(&self) -> Option<&str> {
        self.setup_context
            .get(GOAL_KEY)
            .and_then(Value::as_str)
            .filter(|goal| !goal.trim().is_empty())
            .or_else(|| {
                self.observation
                    .as_deref()
                    .filter(|observation| !observation.trim().is_empty())
            })
    }
}

impl From<WorkerRequest> for RunRequest {
    fn from(request: WorkerRequest) -> Self {
        Self {
            setup_context: request.setup_context,
            environment: request.environment,
            observation: request.observation,
            trajectory_dir: request.trajectory_dir,
            return_type: request.return_type,
            init_stats: Some(request.cost_baseline.baseline()),
        }
    }
}

impl fmt::Debug for RunRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunRequest")
            .field("setup_context", &self.setup_context)
            .field("observation", &self.observation)
            .field("trajectory_dir", &self.trajectory_dir)
            .field("return_type", &self.return_type)
            .field("init_stats", &self.init_stats)
            .finish_non_exhaustive()
    }
}

/// The value a completed run returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub stats: UsageStats,
    pub trajectory: TrajectoryLog,
    pub terminal_fields: Map<String, Value>,
    /// Condensed summary, present when [`ReturnType::Summary`] was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl RunResult {
    /// Copy with every step's execution time cleared, for comparing runs.
    pub fn without_timing(&self) -> Self {
        Self {
            trajectory: self.trajectory.without_timing(),
            ..self.clone()
        }
    }
}
