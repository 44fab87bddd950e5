//! # Foreman Agent - Task-Delegation Coordinator
//!
//! A [`Coordinator`] drives a multi-turn loop with a [`DecisionModel`]. On each turn the model
//! either delegates a narrowly scoped subtask to one of the registered [`Worker`]s through the
//! `call_worker` action, or replies with the completion token once the goal is met. Worker
//! summaries are fed back into the conversation; usage statistics and trajectories from every
//! worker are merged into the run's own.
//!
//! Because [`Coordinator`] implements [`Worker`], a coordinator can be registered as a worker of
//! another coordinator.
//!
//! ## Example
//!
//! ```rust,ignore
//! use foreman_agent::{Coordinator, NullEnvironment, OpenAiDecisionModel, RunRequest, WorkerRegistry};
//! use std::sync::Arc;
//!
//! let registry = WorkerRegistry::builder()
//!     .register("coder", "Edits source files", Arc::new(coder))?
//!     .register("tester", "Runs the test suite", Arc::new(tester))?
//!     .build();
//!
//! let model = Arc::new(OpenAiDecisionModel::new("https://api.openai.com", "gpt-4o", api_key));
//! let coordinator = Coordinator::builder(model, registry).max_turns(30).build()?;
//!
//! let result = coordinator
//!     .run(RunRequest::new(Arc::new(NullEnvironment)).with_goal("Fix the pager"))
//!     .await?;
//! println!("cost so far: {}", result.stats.cost_total);
//! ```

pub mod catalog;
pub mod completion;
pub mod coordinator;
pub mod error;
pub mod prompt;
pub mod registry;
pub mod retry;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod openai;

pub use catalog::{DISPATCH_ACTION, REQUIRED_PARAMETERS, ToolCatalog, ToolDefinition};
pub use completion::{contains_completion_token, strip_completion_token};
pub use coordinator::{Coordinator, CoordinatorBuilder, Decision, TERMINAL_FIELDS, classify};
pub use error::{
    CoordinatorError, CoordinatorResult, EnvironmentError, ModelError, PromptError,
    RegistryError, WorkerError,
};
pub use prompt::{DEFAULT_TEMPLATE, PromptBuilder};
pub use registry::{WorkerDescriptor, WorkerRegistry, WorkerRegistryBuilder};
pub use retry::RetryingModel;
pub use traits::{DecisionModel, NullEnvironment, RunEnvironment, Worker};
pub use types::{
    DialogueTurn, FinishReason, GOAL_KEY, ModelResponse, ReturnType, Role, RunRequest,
    RunResult, SUBTASK_KEY, SetupContext, Subtask, ToolInvocation, WorkerInfo, WorkerOutput,
    WorkerRequest,
};

#[cfg(feature = "openai")]
pub use openai::OpenAiDecisionModel;

pub use foreman_core::{
    ForemanConfig, ModelUsage, PricingPolicy, TrajectoryLog, TrajectoryStep, UsageStats,
    WorkerId,
};
