//! Content picker: unused first, generated when a category is exhausted.
//!
//! Pick-then-record is two separate store writes. A crash between them can
//! hand out the same text again later; that is accepted.

use crate::instructions::instruction_for;
use anyhow::Result;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use vesper_core::{ContentStore, ItemOrigin, VesperError};
use vesper_reasoning::prompts::content_prompt;
use vesper_reasoning::{generate_text, CompletionParams, LlmClient};

/// How a pick was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    /// An unused stored item.
    Existing(String),
    /// Freshly generated and stored.
    Generated(String),
    /// The pick failed; holds the error description.
    Failed(String),
}

impl PickOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, PickOutcome::Failed(_))
    }

    /// Text to post. Failures become the error sentinel.
    pub fn into_text(self) -> String {
        match self {
            PickOutcome::Existing(text) | PickOutcome::Generated(text) => text,
            PickOutcome::Failed(err) => format!("Error pulling message: {}", err),
        }
    }
}

pub struct ContentPicker {
    store: Arc<dyn ContentStore>,
    llm: Arc<dyn LlmClient>,
    params: CompletionParams,
    timeout: Duration,
    // Held across select + record so concurrent rules never pick the same text
    pick_lock: Mutex<()>,
}

impl ContentPicker {
    pub fn new(
        store: Arc<dyn ContentStore>,
        llm: Arc<dyn LlmClient>,
        params: CompletionParams,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            llm,
            params,
            timeout,
            pick_lock: Mutex::new(()),
        }
    }

    /// One message for `category`. Never fails: errors come back as
    /// `"Error pulling message: <error>"`.
    pub async fn pick(&self, category: &str) -> String {
        self.pick_outcome(category).await.into_text()
    }

    pub async fn pick_outcome(&self, category: &str) -> PickOutcome {
        let _guard = self.pick_lock.lock().await;
        match self.try_pick(category).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(category, "Pick failed: {:#}", e);
                PickOutcome::Failed(format!("{:#}", e))
            }
        }
    }

    async fn try_pick(&self, category: &str) -> Result<PickOutcome> {
        let items = self.bounded("list items", self.store.list_items(category)).await?;
        let usage = self.bounded("list usage", self.store.list_usage(category)).await?;

        let used: HashSet<&str> = usage.iter().map(|u| u.text.as_str()).collect();
        let eligible: Vec<&str> = items
            .iter()
            .map(|i| i.text.as_str())
            .filter(|t| !used.contains(t))
            .collect();
        let choice = eligible.choose(&mut rand::thread_rng()).map(|t| t.to_string());

        if let Some(text) = choice {
            tracing::debug!(category, unused = eligible.len(), "Picked stored item");
            self.bounded("record usage", self.store.append_usage(category, &text))
                .await?;
            return Ok(PickOutcome::Existing(text));
        }

        tracing::info!(category, items = items.len(), "Category exhausted, generating");
        let text = generate_text(
            self.llm.as_ref(),
            &content_prompt(),
            Some(instruction_for(category)),
            self.params.clone(),
            self.timeout,
        )
        .await?;
        let text = text.trim().to_string();

        self.bounded(
            "store generated item",
            self.store.append_item(category, &text, ItemOrigin::Generated),
        )
        .await?;
        self.bounded("record usage", self.store.append_usage(category, &text))
            .await?;
        Ok(PickOutcome::Generated(text))
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| VesperError::timeout(operation, self.timeout))?
    }
}
