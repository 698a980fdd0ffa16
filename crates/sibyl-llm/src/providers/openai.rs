use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sibyl_core::config::ModelConfig;
use sibyl_core::error::{Result, SibylError};
use sibyl_core::traits::LlmClient;
use sibyl_core::types::*;

use super::resolve_api_key;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible client. Works with OpenAI, Ollama, vLLM, Groq,
/// OpenRouter, etc. via `base_url`.
pub struct OpenAiClient {
    http: Client,
}

impl OpenAiClient {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }
}

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new()
    }
}

// Request types
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<OaiMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct OaiMessage {
    role: String,
    content: String,
}

// Response types
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<OaiUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OaiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn role_str(role: &Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

impl LlmClient for OpenAiClient {
    fn complete(
        &self,
        config: &ModelConfig,
        messages: Vec<Message>,
    ) -> BoxFuture<'_, Result<Completion>> {
        let config = config.clone();

        Box::pin(async move {
            let api_key = resolve_api_key(&config, "OPENAI_API_KEY")?;
            let url = config
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_API_URL.to_string());

            let request = ChatRequest {
                model: config.model_id.clone(),
                messages: messages
                    .into_iter()
                    .map(|m| OaiMessage {
                        role: role_str(&m.role).to_string(),
                        content: m.content,
                    })
                    .collect(),
                max_tokens: config.max_tokens,
                temperature: Some(config.temperature),
            };

            debug!(model = %config.model_id, "Sending chat completion request");

            let response = self
                .http
                .post(&url)
                .timeout(Duration::from_secs(config.timeout_secs))
                .bearer_auth(api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| SibylError::LlmRequest(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SibylError::LlmRequest(format!("{}: {}", status, body)));
            }

            let parsed: ChatResponse = response
                .json()
                .await
                .map_err(|e| SibylError::LlmParse(e.to_string()))?;

            let content = parsed
                .choices
                .first()
                .and_then(|c| c.message.content.clone())
                .filter(|c| !c.is_empty())
                .ok_or_else(|| SibylError::LlmParse("empty completion content".into()))?;

            let (input_tokens, output_tokens) = parsed
                .usage
                .map(|u| (u.prompt_tokens, u.completion_tokens))
                .unwrap_or((0, 0));

            Ok(Completion {
                content,
                input_tokens,
                output_tokens,
            })
        })
    }
}
