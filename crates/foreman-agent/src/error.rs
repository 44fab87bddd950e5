//! Error types for the coordinator and its collaborators.
//!
//! Every [`CoordinatorError`] aborts the run; there is no partial result. Errors that stem from
//! a specific dispatch carry the coordinator's last free-text rationale and the raw arguments
//! of the offending invocation so a failed run can be debugged from the error alone.

use std::time::Duration;
use thiserror::Error;

use foreman_core::{CoreError, WorkerId};

/// Failures of the decision model call.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The request never produced an HTTP response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider throttled the request.
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// The provider answered with a non-success status.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// The response could not be interpreted.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    /// Check if this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Transport(_) | ModelError::RateLimited { .. } => true,
            ModelError::Api { status, .. } => *status == 429 || *status >= 500,
            ModelError::InvalidResponse(_) => false,
        }
    }

    /// Server-requested delay before retrying, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ModelError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            ModelError::Transport(_) => "TRANSPORT_ERROR",
            ModelError::RateLimited { .. } => "RATE_LIMITED",
            ModelError::Api { .. } => "API_ERROR",
            ModelError::InvalidResponse(_) => "INVALID_RESPONSE",
        }
    }
}

/// Failures reported by a worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker could not complete its subtask.
    #[error("Worker failed: {0}")]
    Failed(String),

    /// A nested coordinator run failed.
    #[error("Nested coordinator failed: {0}")]
    Nested(#[source] Box<CoordinatorError>),
}

/// Failures of the run environment.
#[derive(Debug, Error)]
#[error("Environment error: {message}")]
pub struct EnvironmentError {
    pub message: String,
}

impl EnvironmentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failures building or querying the worker registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No worker is registered under the id.
    #[error("Unknown worker: {0}")]
    UnknownWorker(String),

    /// Two workers were registered under the same id.
    #[error("Duplicate worker: {0}")]
    DuplicateWorker(WorkerId),

    /// A configured worker has no handle bound to it.
    #[error("No handle bound for configured worker: {0}")]
    MissingHandle(WorkerId),

    /// A worker id failed validation.
    #[error(transparent)]
    InvalidId(#[from] CoreError),
}

/// Failures rendering the system prompt.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Template registration failed: {0}")]
    RegistrationFailed(#[from] handlebars::TemplateError),

    #[error("Template rendering failed: {0}")]
    RenderingFailed(#[from] handlebars::RenderError),
}

/// Errors that abort a coordinator run.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The coordinator or run request is misconfigured.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The decision model asked for a worker that is not registered.
    #[error("Unknown worker '{worker}' requested (rationale: {rationale:?}, arguments: {arguments})")]
    UnknownWorker {
        worker: String,
        rationale: String,
        arguments: serde_json::Value,
    },

    /// The decision model emitted an invocation missing a required parameter.
    #[error("Malformed invocation: {reason} (rationale: {rationale:?}, arguments: {arguments})")]
    MalformedInvocation {
        reason: String,
        rationale: String,
        arguments: serde_json::Value,
    },

    /// The decision model call failed.
    #[error("Decision model failed: {source} (last rationale: {rationale:?})")]
    DecisionModel {
        #[source]
        source: ModelError,
        rationale: Option<String>,
    },

    /// A dispatched worker failed.
    #[error("Worker '{worker}' failed: {source} (rationale: {rationale:?}, arguments: {arguments})")]
    WorkerRun {
        worker: WorkerId,
        #[source]
        source: WorkerError,
        rationale: String,
        arguments: serde_json::Value,
    },

    /// The run environment rejected the completion signal.
    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    /// The run used up its decision turns without completing.
    #[error("Turn limit of {limit} reached without completion (last rationale: {rationale:?})")]
    TurnLimitExceeded {
        limit: usize,
        rationale: Option<String>,
    },

    /// The run's cumulative cost passed the configured limit.
    #[error("Cost limit of {limit} exceeded (total: {total})")]
    CostLimitExceeded { limit: f64, total: f64 },

    /// The system prompt could not be rendered.
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl CoordinatorError {
    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoordinatorError::Config(_) => "CONFIG_ERROR",
            CoordinatorError::UnknownWorker { .. } => "UNKNOWN_WORKER",
            CoordinatorError::MalformedInvocation { .. } => "MALFORMED_INVOCATION",
            CoordinatorError::DecisionModel { .. } => "DECISION_MODEL_ERROR",
            CoordinatorError::WorkerRun { .. } => "WORKER_RUN_ERROR",
            CoordinatorError::Environment(_) => "ENVIRONMENT_ERROR",
            CoordinatorError::TurnLimitExceeded { .. } => "TURN_LIMIT_EXCEEDED",
            CoordinatorError::CostLimitExceeded { .. } => "COST_LIMIT_EXCEEDED",
            CoordinatorError::Prompt(_) => "PROMPT_ERROR",
        }
    }

    /// The coordinator's free-text rationale at the time of failure, if known.
    pub fn rationale(&self) -> Option<&str> {
        match self {
            CoordinatorError::UnknownWorker { rationale, .. }
            | CoordinatorError::MalformedInvocation { rationale, .. }
            | CoordinatorError::WorkerRun { rationale, .. } => Some(rationale),
            CoordinatorError::DecisionModel { rationale, .. }
            | CoordinatorError::TurnLimitExceeded { rationale, .. } => rationale.as_deref(),
            _ => None,
        }
    }

    /// Raw arguments of the invocation that caused the failure, if any.
    pub fn arguments(&self) -> Option<&serde_json::Value> {
        match self {
            CoordinatorError::UnknownWorker { arguments, .. }
            | CoordinatorError::MalformedInvocation { arguments, .. }
            | CoordinatorError::WorkerRun { arguments, .. } => Some(arguments),
            _ => None,
        }
    }
}

/// Result type for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_error_retryable() {
        assert!(ModelError::Transport("reset".into()).is_retryable());
        assert!(
            ModelError::RateLimited {
                message: "slow down".into(),
                retry_after: None
            }
            .is_retryable()
        );
        assert!(
            ModelError::Api {
                status: 503,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            !ModelError::Api {
                status: 401,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!ModelError::InvalidResponse("no choices".into()).is_retryable());
    }

    #[test]
    fn test_unknown_worker_carries_context() {
        let err = CoordinatorError::UnknownWorker {
            worker: "painter".into(),
            rationale: "Time to paint.".into(),
            arguments: json!({"worker": "painter"}),
        };
        assert_eq!(err.error_code(), "UNKNOWN_WORKER");
        assert_eq!(err.rationale(), Some("Time to paint."));
        assert_eq!(err.arguments(), Some(&json!({"worker": "painter"})));
        let text = err.to_string();
        assert!(text.contains("painter"));
        assert!(text.contains("Time to paint."));
    }

    #[test]
    fn test_decision_model_error_source() {
        let err = CoordinatorError::DecisionModel {
            source: ModelError::Transport("connection refused".into()),
            rationale: None,
        };
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "Transport error: connection refused");
        assert_eq!(err.rationale(), None);
    }
}
