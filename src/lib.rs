//! # Foreman
//!
//! Foreman is a task-delegation coordinator. Given a high-level goal and a fixed set of
//! specialized workers, it runs a reasoning model in a loop that breaks the goal into narrowly
//! scoped subtasks, dispatches each to the best-suited worker, folds the worker's report back
//! into the conversation and stops when the model declares the goal met.
//!
//! ## Core Components
//!
//! - **[Coordinator]**: the control loop; also a [Worker], so coordinators nest
//! - **[WorkerRegistry]**: the fixed catalog of workers a coordinator may dispatch to
//! - **[DecisionModel]**: the reasoning collaborator choosing the next subtask
//! - **[UsageStats]**: usage and cost counters merged across the run and its workers
//! - **[TrajectoryLog]**: ordered record of dispatch decisions and worker steps
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use foreman_workspace::{Coordinator, NullEnvironment, RunRequest, WorkerRegistry};
//! use std::sync::Arc;
//!
//! let registry = WorkerRegistry::builder()
//!     .register("coder", "Edits source files", Arc::new(coder))?
//!     .register("tester", "Runs the test suite", Arc::new(tester))?
//!     .build();
//!
//! let coordinator = Coordinator::builder(Arc::new(model), registry).build()?;
//! let result = coordinator
//!     .run(RunRequest::new(Arc::new(NullEnvironment)).with_goal("Fix the pager"))
//!     .await?;
//! ```

pub use foreman_agent as agent;
pub use foreman_core as core;

pub use foreman_agent::{
    Coordinator, CoordinatorBuilder, CoordinatorError, CoordinatorResult, DecisionModel,
    DialogueTurn, EnvironmentError, FinishReason, ModelError, ModelResponse, NullEnvironment,
    RetryingModel, ReturnType, RunEnvironment, RunRequest, RunResult, Subtask, ToolCatalog,
    ToolInvocation, Worker, WorkerError, WorkerOutput, WorkerRegistry, WorkerRequest,
};

#[cfg(feature = "openai")]
pub use foreman_agent::OpenAiDecisionModel;

pub use foreman_core::{
    ForemanConfig, ModelUsage, PricingPolicy, TrajectoryLog, TrajectoryStep, UsageStats,
    WorkerId,
};
