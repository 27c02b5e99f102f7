//! Conversational responder.
//!
//! classify tone -> persist mode -> persona prompt -> generate -> restart the
//! silence clock (on success only).

use crate::llm::{generate_text, CompletionParams, LlmClient};
use crate::prompts::persona_prompt;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use vesper_core::{Mode, ToneClassifier, VesperError};
use vesper_mood::MoodHandle;

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub mode: Mode,
    /// False when `text` is an error sentinel.
    pub delivered: bool,
}

pub struct Responder {
    llm: Arc<dyn LlmClient>,
    classifier: Arc<dyn ToneClassifier>,
    mood: Arc<MoodHandle>,
    params: CompletionParams,
    timeout: Duration,
    tz: Tz,
}

impl Responder {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        classifier: Arc<dyn ToneClassifier>,
        mood: Arc<MoodHandle>,
        params: CompletionParams,
        timeout: Duration,
        tz: Tz,
    ) -> Self {
        Self {
            llm,
            classifier,
            mood,
            params,
            timeout,
            tz,
        }
    }

    pub async fn respond(&self, text: &str) -> Reply {
        self.respond_at(text, Utc::now()).await
    }

    pub async fn respond_at(&self, text: &str, now: DateTime<Utc>) -> Reply {
        let mode = self.resolve_mode(text).await;
        if let Err(e) = self.mood.update(|s| s.mode = mode).await {
            tracing::error!("Failed to persist mode {}: {:#}", mode, e);
        }

        let clock = now.with_timezone(&self.tz).format("%A %Y-%m-%d %I:%M %p %Z").to_string();
        let system = persona_prompt(mode, &clock);

        match generate_text(self.llm.as_ref(), &system, Some(text), self.params.clone(), self.timeout).await {
            Ok(reply) => {
                if let Err(e) = self.mood.update(|s| s.touch(now)).await {
                    tracing::error!("Failed to persist interaction time: {:#}", e);
                }
                Reply {
                    text: reply,
                    mode,
                    delivered: true,
                }
            }
            Err(e) => {
                tracing::warn!("Reply generation failed: {:#}", e);
                Reply {
                    text: format!("Something went wrong: {}", e),
                    mode,
                    delivered: false,
                }
            }
        }
    }

    /// The classifier's mode, or the current one when the label is unusable.
    async fn resolve_mode(&self, text: &str) -> Mode {
        let current = self.mood.snapshot().await.mode;
        let classified = tokio::time::timeout(self.timeout, self.classifier.classify(text))
            .await
            .map_err(|_| anyhow::Error::from(VesperError::timeout("classification", self.timeout)))
            .and_then(|r| r);
        match classified {
            Ok(Some(mode)) => {
                if mode != current {
                    tracing::info!("Mode {} -> {}", current, mode);
                }
                mode
            }
            Ok(None) => {
                tracing::debug!("Unrecognized tone, keeping {}", current);
                current
            }
            Err(e) => {
                tracing::warn!("Tone classification failed, keeping {}: {:#}", current, e);
                current
            }
        }
    }
}
