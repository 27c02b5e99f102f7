use crate::api_types::{Message, MessagesResponse};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use vesper_core::VesperError;

/// Parameters for a single completion
#[derive(Debug, Clone)]
pub struct CompletionParams {
    /// Maximum tokens to generate (will be clamped to provider limits)
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 200,
            temperature: 0.7,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a chat completion request.
    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        params: CompletionParams,
    ) -> Result<MessagesResponse>;
}

/// One-shot text generation with a deadline.
///
/// Returns the completion as the model wrote it. Fails with
/// `VesperError::Timeout` when `timeout` expires and with
/// `VesperError::Generation` when the model returns only whitespace.
pub async fn generate_text(
    client: &dyn LlmClient,
    system: &str,
    user: Option<&str>,
    params: CompletionParams,
    timeout: Duration,
) -> Result<String> {
    let messages = user.map(Message::user).into_iter().collect();
    let response = tokio::time::timeout(timeout, client.complete(system, messages, params))
        .await
        .map_err(|_| VesperError::timeout("generation", timeout))??;

    if let Some(usage) = &response.usage {
        tracing::debug!(
            prompt = usage.prompt_tokens,
            completion = usage.completion_tokens,
            "Completion usage"
        );
    }

    if response.text.trim().is_empty() {
        return Err(VesperError::Generation(format!(
            "empty completion (stop_reason: {})",
            response.stop_reason.as_deref().unwrap_or("none")
        ))
        .into());
    }
    Ok(response.text)
}
