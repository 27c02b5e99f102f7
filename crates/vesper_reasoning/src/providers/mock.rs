//! Mock LLM Provider: deterministic responses for testing without API keys.

use crate::api_types::{Message, MessagesResponse};
use crate::llm::{CompletionParams, LlmClient};
use anyhow::Result;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// What the mock was asked.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub messages: Vec<Message>,
    pub params: CompletionParams,
}

/// Pops scripted responses in order; once the script runs out it answers
/// with a fixed echo line.
#[derive(Debug)]
pub struct MockProvider {
    model: String,
    script: Mutex<VecDeque<Result<MessagesResponse, String>>>,
    recorded: Mutex<Vec<RecordedCall>>,
    call_count: AtomicUsize,
    latency: Duration,
}

impl MockProvider {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            script: Mutex::new(VecDeque::new()),
            recorded: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }

    pub fn scripted(responses: Vec<MessagesResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            ..Self::new("mock")
        }
    }

    /// Every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            script: Mutex::new((0..64).map(|_| Err(message.to_string())).collect()),
            ..Self::new("mock")
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub async fn push_text(&self, text: &str) {
        self.script.lock().await.push_back(Ok(MessagesResponse::text(text)));
    }

    pub async fn push_error(&self, message: &str) {
        self.script.lock().await.push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub async fn recorded(&self) -> Vec<RecordedCall> {
        self.recorded.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for MockProvider {
    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        params: CompletionParams,
    ) -> Result<MessagesResponse> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.recorded.lock().await.push(RecordedCall {
            system: system.to_string(),
            messages,
            params,
        });
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.script.lock().await.pop_front() {
            Some(Ok(resp)) => Ok(resp),
            Some(Err(e)) => anyhow::bail!("{}", e),
            None => Ok(MessagesResponse::text(&format!(
                "(Mock {} Response) I received your prompt.",
                self.model
            ))),
        }
    }
}
