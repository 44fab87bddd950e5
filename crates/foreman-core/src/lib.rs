//! # Foreman Core
//!
//! Core types shared by the Foreman coordinator crates.
//!
//! - **[UsageStats]**: additive usage/cost counters carried across a run and its worker sub-runs
//! - **[TrajectoryLog]**: append-only record of dispatch decisions and worker steps
//! - **[WorkerId]**: validated identifier for a registered worker
//! - **[ForemanConfig]**: TOML configuration for model, pricing, retry and worker catalog

pub mod config;
pub mod error;
pub mod identifiers;
pub mod stats;
pub mod trajectory;

pub use config::{
    CoordinatorSettings, ForemanConfig, ModelSettings, RetrySettings, WorkerSettings,
};
pub use error::{CoreError, CoreResult};
pub use identifiers::{IdValidationError, IdValidator, WorkerId};
pub use stats::{ModelUsage, PricingPolicy, UsageStats};
pub use trajectory::{TrajectoryLog, TrajectoryStep};
