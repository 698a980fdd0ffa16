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

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    http: Client,
}

impl AnthropicClient {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }
}

impl Default for AnthropicClient {
    fn default() -> Self {
        Self::new()
    }
}

// Anthropic API request types
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

// Anthropic API response types
#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ResponseBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct UsageInfo {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

fn convert_messages(messages: Vec<Message>) -> (Option<String>, Vec<ApiMessage>) {
    let mut system_parts: Vec<String> = Vec::new();
    let mut api_msgs = Vec::new();

    for msg in messages {
        match msg.role {
            Role::System => system_parts.push(msg.content),
            Role::User => api_msgs.push(ApiMessage {
                role: "user".to_string(),
                content: msg.content,
            }),
            Role::Assistant => api_msgs.push(ApiMessage {
                role: "assistant".to_string(),
                content: msg.content,
            }),
        }
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    (system, api_msgs)
}

impl LlmClient for AnthropicClient {
    fn complete(
        &self,
        config: &ModelConfig,
        messages: Vec<Message>,
    ) -> BoxFuture<'_, Result<Completion>> {
        let config = config.clone();

        Box::pin(async move {
            let api_key = resolve_api_key(&config, "ANTHROPIC_API_KEY")?;
            let url = config
                .base_url
                .clone()
                .unwrap_or_else(|| ANTHROPIC_API_URL.to_string());

            let (system, api_msgs) = convert_messages(messages);
            let request = AnthropicRequest {
                model: config.model_id.clone(),
                max_tokens: config.max_tokens,
                temperature: Some(config.temperature),
                messages: api_msgs,
                system,
            };

            debug!(model = %config.model_id, "Sending Anthropic completion request");

            let response = self
                .http
                .post(&url)
                .timeout(Duration::from_secs(config.timeout_secs))
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&request)
                .send()
                .await
                .map_err(|e| SibylError::LlmRequest(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SibylError::LlmRequest(format!("{}: {}", status, body)));
            }

            let parsed: AnthropicResponse = response
                .json()
                .await
                .map_err(|e| SibylError::LlmParse(e.to_string()))?;

            let content: String = parsed
                .content
                .iter()
                .filter_map(|b| match b {
                    ResponseBlock::Text { text } => Some(text.as_str()),
                    ResponseBlock::Other => None,
                })
                .collect::<Vec<_>>()
                .join("");

            if content.is_empty() {
                return Err(SibylError::LlmParse("empty completion content".into()));
            }

            let (input_tokens, output_tokens) = parsed
                .usage
                .map(|u| (u.input_tokens, u.output_tokens))
                .unwrap_or((0, 0));

            Ok(Completion {
                content,
                input_tokens,
                output_tokens,
            })
        })
    }
}
