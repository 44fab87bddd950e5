//! Decision model backed by an OpenAI-compatible chat completions API.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use foreman_core::{ModelSettings, ModelUsage};

use crate::catalog::ToolCatalog;
use crate::error::ModelError;
use crate::traits::DecisionModel;
use crate::types::{DialogueTurn, FinishReason, ModelResponse, Role, ToolInvocation};

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    tools: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ChatToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ChatToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: ChatFunction,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ChatFunction {
    name: String,
    /// JSON-encoded arguments, as the API transmits them
    arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// Decision model speaking the OpenAI chat completions protocol with function tools.
pub struct OpenAiDecisionModel {
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    http_client: reqwest::Client,
}

impl OpenAiDecisionModel {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            temperature: None,
            max_tokens: None,
            http_client: reqwest::Client::new(),
        }
    }

    /// Build from configuration, resolving the API key from the environment.
    pub fn from_settings(settings: &ModelSettings) -> Self {
        let mut model = Self::new(&settings.base_url, &settings.model, settings.api_key());
        model.temperature = settings.temperature;
        model.max_tokens = settings.max_tokens;
        model
    }

    fn to_message(turn: &DialogueTurn) -> ChatMessage {
        match turn.role {
            Role::System => ChatMessage {
                role: "system".to_string(),
                content: Some(turn.content.clone()),
                ..Default::default()
            },
            Role::Assistant => ChatMessage {
                role: "assistant".to_string(),
                content: (!turn.content.is_empty()).then(|| turn.content.clone()),
                tool_calls: turn
                    .tool_calls
                    .iter()
                    .map(|call| ChatToolCall {
                        id: call.id.clone(),
                        kind: function_type(),
                        function: ChatFunction {
                            name: call.name.clone(),
                            arguments: call.arguments.to_string(),
                        },
                    })
                    .collect(),
                tool_call_id: None,
            },
            Role::ToolResult => ChatMessage {
                role: "tool".to_string(),
                content: Some(turn.content.clone()),
                tool_calls: Vec::new(),
                tool_call_id: turn.tool_call_id.clone(),
            },
        }
    }

    fn build_request(&self, turns: &[DialogueTurn], catalog: &ToolCatalog) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: turns.iter().map(Self::to_message).collect(),
            tools: catalog.to_openai_tools(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    fn parse_response(response: ChatResponse) -> Result<ModelResponse, ModelError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("no choices in response".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|call| {
                // Undecodable arguments are kept verbatim and rejected at dispatch.
                let arguments = serde_json::from_str(&call.function.arguments)
                    .unwrap_or(Value::String(call.function.arguments));
                ToolInvocation::new(call.id, call.function.name, arguments)
            })
            .collect();

        let usage = response
            .usage
            .map(|u| ModelUsage::single_call(u.prompt_tokens, u.completion_tokens))
            .unwrap_or(ModelUsage {
                calls: 1,
                ..ModelUsage::default()
            });

        Ok(ModelResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason: choice
                .finish_reason
                .as_deref()
                .map(FinishReason::parse)
                .unwrap_or(FinishReason::Stop),
            tool_calls,
            usage,
        })
    }
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl DecisionModel for OpenAiDecisionModel {
    async fn decide(
        &self,
        turns: &[DialogueTurn],
        catalog: &ToolCatalog,
    ) -> Result<ModelResponse, ModelError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request(turns, catalog);

        let mut http_req = self.http_client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            http_req = http_req.bearer_auth(key);
        }

        let response = http_req
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(response.headers());
            let message = response.text().await.unwrap_or_default();
            return Err(ModelError::RateLimited {
                message,
                retry_after,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
        let decision = Self::parse_response(parsed)?;

        debug!(
            model = %self.model,
            tokens_in = decision.usage.tokens_in,
            tokens_out = decision.usage.tokens_out,
            "Chat completion received"
        );
        Ok(decision)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
