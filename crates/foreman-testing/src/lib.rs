//! # Foreman Testing
//!
//! Test doubles for the coordinator's three collaborator seams.
//!
//! - **[ScriptedModel]**: replays a fixed list of decision model replies
//! - **[MockWorker]**: returns canned summaries, steps and stats, and records its requests
//! - **[StubEnvironment]**: answers the completion signal with a fixed report
//!
//! ## Usage
//!
//! ```rust,ignore
//! use foreman_testing::{MockWorker, ScriptedModel, StubEnvironment, dispatch, dispatch_call, done};
//!
//! let coder = Arc::new(MockWorker::new("coder").with_summary("patched"));
//! let model = ScriptedModel::from_responses([
//!     dispatch("Coder first.", vec![dispatch_call("c1", "coder", "patch", "none", "fix bug")]),
//!     done("DONE"),
//! ]);
//! ```

/// Stub run environments
pub mod environment;
/// Reply builders
pub mod fixtures;
/// Scripted decision models
pub mod mock_model;
/// Mock workers
pub mod mock_workers;

pub use environment::StubEnvironment;
pub use fixtures::{dispatch, dispatch_call, done};
pub use mock_model::{ScriptedModel, ScriptedReply};
pub use mock_workers::{CallLog, MockWorker};
