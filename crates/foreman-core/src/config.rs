//! Configuration loading and validation.
//!
//! A Foreman deployment is described by a single TOML file:
//!
//! ```toml
//! [model]
//! base_url = "https://api.openai.com"
//! model = "gpt-4o"
//! api_key_env = "OPENAI_API_KEY"
//!
//! [pricing]
//! price_in = 0.0000025
//! price_out = 0.00001
//!
//! [coordinator]
//! completion_token = "DONE"
//! max_turns = 40
//!
//! [retry]
//! max_retries = 3
//! initial_delay = "500ms"
//! max_delay = "30s"
//!
//! [[workers]]
//! id = "coder"
//! description = "Edits source files to implement a change"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::identifiers::WorkerId;
use crate::stats::PricingPolicy;

/// Default literal the decision model emits when the goal is satisfied.
pub const DEFAULT_COMPLETION_TOKEN: &str = "DONE";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForemanConfig {
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub pricing: PricingPolicy,
    #[serde(default)]
    pub coordinator: CoordinatorSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub workers: Vec<WorkerSettings>,
}

/// Decision model endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSettings {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name sent with every request
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key; no key is sent when unset
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl ModelSettings {
    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty())
    }
}

/// Control-loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoordinatorSettings {
    /// Literal token that ends a run
    #[serde(default = "default_completion_token")]
    pub completion_token: String,
    /// Abort after this many decision turns (unbounded when unset)
    #[serde(default)]
    pub max_turns: Option<usize>,
    /// Abort once cumulative cost exceeds this amount (unbounded when unset)
    #[serde(default)]
    pub cost_limit: Option<f64>,
    /// Handlebars template replacing the built-in system prompt
    #[serde(default)]
    pub prompt_template: Option<String>,
}

fn default_completion_token() -> String {
    DEFAULT_COMPLETION_TOKEN.to_string()
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            completion_token: default_completion_token(),
            max_turns: None,
            cost_limit: None,
            prompt_template: None,
        }
    }
}

/// Retry/backoff policy for decision model calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay", with = "humantime_duration")]
    pub initial_delay: Duration,
    #[serde(default = "default_max_delay", with = "humantime_duration")]
    pub max_delay: Duration,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetrySettings {
    /// Settings that never retry.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (zero-based), capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// A worker entry in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerSettings {
    pub id: WorkerId,
    pub description: String,
}

impl ForemanConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        debug!(path = %path.display(), "Loaded configuration file");
        Self::load_from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn load_from_toml(toml_content: &str) -> CoreResult<Self> {
        let config: Self = toml::from_str(toml_content)
            .map_err(|e| CoreError::config(format!("Failed to parse TOML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> CoreResult<()> {
        let token = &self.coordinator.completion_token;
        if token.is_empty() || token.chars().any(char::is_whitespace) {
            return Err(CoreError::config(format!(
                "completion_token must be a single non-empty word, got {:?}",
                token
            )));
        }

        for (name, price) in [
            ("price_in", self.pricing.price_in),
            ("price_out", self.pricing.price_out),
        ] {
            if !price.is_finite() || price < 0.0 {
                return Err(CoreError::config(format!(
                    "pricing.{} must be a non-negative number, got {}",
                    name, price
                )));
            }
        }

        if self.coordinator.max_turns == Some(0) {
            return Err(CoreError::config("coordinator.max_turns must be at least 1"));
        }

        if let Some(limit) = self.coordinator.cost_limit
            && (!limit.is_finite() || limit <= 0.0)
        {
            return Err(CoreError::config(format!(
                "coordinator.cost_limit must be positive, got {}",
                limit
            )));
        }

        let multiplier = self.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(CoreError::config(format!(
                "retry.backoff_multiplier must be >= 1.0, got {}",
                self.retry.backoff_multiplier
            )));
        }

        let mut seen = HashSet::new();
        for worker in &self.workers {
            if !seen.insert(worker.id.as_str()) {
                return Err(CoreError::config(format!(
                    "worker '{}' is declared more than once",
                    worker.id
                )));
            }
            if worker.description.trim().is_empty() {
                return Err(CoreError::config(format!(
                    "worker '{}' needs a capability description",
                    worker.id
                )));
            }
        }

        Ok(())
    }
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
