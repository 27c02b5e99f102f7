//! Tone classifiers: map a user message to one of the four modes.

use crate::llm::{generate_text, CompletionParams, LlmClient};
use crate::prompts::CLASSIFY_PROMPT;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use vesper_core::{Mode, ToneClassifier, VesperError};

/// Asks the generation service for a label.
pub struct LlmToneClassifier {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl LlmToneClassifier {
    pub fn new(llm: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }
}

#[async_trait]
impl ToneClassifier for LlmToneClassifier {
    async fn classify(&self, text: &str) -> Result<Option<Mode>> {
        let params = CompletionParams {
            max_tokens: 5,
            temperature: 0.0,
        };
        let label = generate_text(self.llm.as_ref(), CLASSIFY_PROMPT, Some(text), params, self.timeout)
            .await?;
        let mode = Mode::parse_label(&label);
        if mode.is_none() {
            tracing::debug!("{}", VesperError::ClassificationAmbiguous(label));
        }
        Ok(mode)
    }
}

const CREATIVE: &[&str] = &[
    "idea", "create", "draw", "paint", "write", "song", "story", "design", "imagine", "wild",
    "brainstorm", "🎨", "✨",
];

const DEVOTION: &[&str] = &[
    "miss you", "love", "thank", "grateful", "need you", "proud", "sorry", "hug", "❤️", "🥺",
];

const PUNISHMENT: &[&str] = &[
    "lazy", "skipped", "didn't", "procrastinat", "later", "tomorrow", "can't be bothered",
    "excuse", "failed", "punish",
];

/// Keyword lists, no network. Ties and no hits are unrecognized.
#[derive(Debug, Default)]
pub struct KeywordToneClassifier;

impl KeywordToneClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify_text(&self, text: &str) -> Option<Mode> {
        let lower = text.to_lowercase();
        let hits = |words: &[&str]| words.iter().filter(|w| lower.contains(*w)).count();
        let mut scores = [
            (Mode::Creative, hits(CREATIVE)),
            (Mode::Devotion, hits(DEVOTION)),
            (Mode::Punishment, hits(PUNISHMENT)),
        ];
        scores.sort_by(|a, b| b.1.cmp(&a.1));
        match scores {
            [(_, 0), ..] => Some(Mode::Default),
            [(top, a), (_, b), _] if a > b => Some(top),
            _ => None,
        }
    }
}

#[async_trait]
impl ToneClassifier for KeywordToneClassifier {
    async fn classify(&self, text: &str) -> Result<Option<Mode>> {
        Ok(self.classify_text(text))
    }
}
