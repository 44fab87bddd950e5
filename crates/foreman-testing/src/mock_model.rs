//! # Scripted Decision Model
//!
//! A [`DecisionModel`] that replays a fixed sequence of responses and records every
//! conversation it was shown, so tests can assert on exactly what the coordinator sent.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use foreman_agent::{DecisionModel, DialogueTurn, ModelError, ModelResponse, ToolCatalog};

/// One scripted model reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptedReply {
    /// Return this response
    Respond(ModelResponse),
    /// Fail with a transport error carrying this message
    Fail { error: String },
}

/// A decision model that answers from a script.
///
/// Once the script is exhausted every call fails with [`ModelError::InvalidResponse`].
#[derive(Debug, Clone)]
pub struct ScriptedModel {
    name: String,
    script: Arc<Mutex<VecDeque<ScriptedReply>>>,
    seen: Arc<Mutex<Vec<Vec<DialogueTurn>>>>,
    catalogs: Arc<Mutex<Vec<ToolCatalog>>>,
}

impl ScriptedModel {
    /// Create an empty script
    pub fn new() -> Self {
        Self {
            name: "scripted".to_string(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            seen: Arc::new(Mutex::new(Vec::new())),
            catalogs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a script from a list of responses
    pub fn from_responses(responses: impl IntoIterator<Item = ModelResponse>) -> Self {
        Self::from_replies(responses.into_iter().map(ScriptedReply::Respond))
    }

    /// Create a script from a list of replies, including failures
    pub fn from_replies(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        let model = Self::new();
        model.script.lock().unwrap().extend(replies);
        model
    }

    /// Set the name reported by `model_name`
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Append a response to the script
    pub fn then(self, response: ModelResponse) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Respond(response));
        self
    }

    /// Append a failure to the script
    pub fn then_fail(self, error: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(ScriptedReply::Fail {
            error: error.into(),
        });
        self
    }

    /// Number of times the model was asked to decide
    pub fn call_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Conversations the model was shown, one per call
    pub fn seen_turns(&self) -> Vec<Vec<DialogueTurn>> {
        self.seen.lock().unwrap().clone()
    }

    /// The catalog offered on the most recent call
    pub fn last_catalog(&self) -> Option<ToolCatalog> {
        self.catalogs.lock().unwrap().last().cloned()
    }

    /// Replies not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecisionModel for ScriptedModel {
    async fn decide(
        &self,
        turns: &[DialogueTurn],
        catalog: &ToolCatalog,
    ) -> Result<ModelResponse, ModelError> {
        self.seen.lock().unwrap().push(turns.to_vec());
        self.catalogs.lock().unwrap().push(catalog.clone());

        match self.script.lock().unwrap().pop_front() {
            Some(ScriptedReply::Respond(response)) => Ok(response),
            Some(ScriptedReply::Fail { error }) => Err(ModelError::Transport(error)),
            None => Err(ModelError::InvalidResponse(
                "scripted model has no replies left".to_string(),
            )),
        }
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreman_agent::WorkerRegistry;

    fn catalog() -> ToolCatalog {
        ToolCatalog::for_registry(&WorkerRegistry::default())
    }

    #[tokio::test]
    async fn replays_in_order_then_fails() {
        let model = ScriptedModel::new()
            .then(ModelResponse::stop("first"))
            .then_fail("connection reset");
        let turns = vec![DialogueTurn::system("go")];

        let first = model.decide(&turns, &catalog()).await.unwrap();
        assert_eq!(first.content, "first");
        assert!(matches!(
            model.decide(&turns, &catalog()).await,
            Err(ModelError::Transport(_))
        ));
        assert!(matches!(
            model.decide(&turns, &catalog()).await,
            Err(ModelError::InvalidResponse(_))
        ));
        assert_eq!(model.call_count(), 3);
        assert_eq!(model.seen_turns()[0], turns);
    }

    #[test]
    fn replies_deserialize_from_yaml_like_json() {
        let replies: Vec<ScriptedReply> = serde_json::from_value(serde_json::json!([
            {"content": "DONE", "finish_reason": "stop"},
            {"error": "boom"}
        ]))
        .unwrap();
        assert!(matches!(replies[0], ScriptedReply::Respond(_)));
        assert_eq!(
            replies[1],
            ScriptedReply::Fail {
                error: "boom".into()
            }
        );
    }
}
