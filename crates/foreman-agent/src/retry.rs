//! Retry wrapper for decision models.

use async_trait::async_trait;
use tracing::warn;

use foreman_core::RetrySettings;

use crate::catalog::ToolCatalog;
use crate::error::ModelError;
use crate::traits::DecisionModel;
use crate::types::{DialogueTurn, ModelResponse};

/// Retries transient decision model failures with exponential backoff.
///
/// Only errors for which [`ModelError::is_retryable`] holds are retried. A server-supplied
/// `Retry-After` takes precedence over the computed delay.
pub struct RetryingModel<M: DecisionModel> {
    inner: M,
    settings: RetrySettings,
}

impl<M: DecisionModel> RetryingModel<M> {
    pub fn new(inner: M, settings: RetrySettings) -> Self {
        Self { inner, settings }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }
}

#[async_trait]
impl<M: DecisionModel> DecisionModel for RetryingModel<M> {
    async fn decide(
        &self,
        turns: &[DialogueTurn],
        catalog: &ToolCatalog,
    ) -> Result<ModelResponse, ModelError> {
        let mut attempt = 0;
        loop {
            match self.inner.decide(turns, catalog).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.settings.max_retries && e.is_retryable() => {
                    let delay = e
                        .retry_after()
                        .unwrap_or_else(|| self.settings.delay_for(attempt));
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.settings.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying decision model request"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
