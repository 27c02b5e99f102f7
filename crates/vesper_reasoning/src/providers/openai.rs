use crate::api_types::{Message, MessagesResponse, Role, Usage};
use crate::llm::{CompletionParams, LlmClient};
use crate::retry::{with_retry, RetryConfig};
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;
use vesper_core::VesperError;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryConfig,
}

impl OpenAiClient {
    /// `base_url` wins over `OPENAI_BASE_URL`; the key always comes from
    /// `OPENAI_API_KEY`.
    pub fn new(model: &str, base_url: Option<&str>) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
        let base_url = base_url
            .map(str::to_string)
            .or_else(|| env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(60)).build()?,
            api_key,
            base_url,
            model: model.to_string(),
            retry: RetryConfig::default(),
        })
    }
}

/// Convert messages to OpenAI chat format; the system prompt goes first.
fn build_openai_messages(system: &str, messages: &[Message]) -> Vec<Value> {
    let mut openai_messages = vec![json!({"role": "system", "content": system})];
    for msg in messages {
        let role = match msg.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        openai_messages.push(json!({"role": role, "content": msg.content}));
    }
    openai_messages
}

/// Parse a non-streaming chat-completions response.
pub(crate) fn parse_openai_response(resp_json: &Value) -> Result<MessagesResponse> {
    let choice = resp_json["choices"]
        .get(0)
        .ok_or_else(|| VesperError::Generation("response has no choices".to_string()))?;
    let text = choice["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let stop_reason = choice["finish_reason"].as_str().map(|s| s.to_string());
    let usage = resp_json.get("usage").map(|u| Usage {
        prompt_tokens: u["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: u["completion_tokens"].as_u64().unwrap_or(0) as u32,
    });

    Ok(MessagesResponse {
        text,
        stop_reason,
        usage,
    })
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        params: CompletionParams,
    ) -> Result<MessagesResponse> {
        let payload = json!({
            "model": self.model,
            "messages": build_openai_messages(system, &messages),
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        });
        let url = format!("{}/chat/completions", self.base_url);

        let response = with_retry(&self.retry, "OpenAI", || {
            let request = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&payload);
            async move {
                request
                    .send()
                    .await
                    .map_err(|e| anyhow::Error::from(VesperError::unavailable("OpenAI", e)))
            }
        })
        .await?;

        let resp_json: Value = response
            .json()
            .await
            .context("Failed to decode OpenAI response")?;
        parse_openai_response(&resp_json)
    }
}
