use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use vesper_content::ContentPicker;
use vesper_core::config::RuleConfig;
use vesper_core::{
    ChannelResolver, ContentStore, DispatchRecord, DispatchStatus, OutputChannel, VesperError,
};
use vesper_mood::MoodHandle;

/// What happened to one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Text reached the channel.
    Sent,
    /// No channel; nothing was picked or sent.
    Skipped,
    /// Something was sent or attempted but the pick or the send failed.
    Failed,
}

/// Resolve the channel, pick, post, log.
pub struct Dispatcher {
    resolver: Arc<dyn ChannelResolver>,
    picker: Arc<ContentPicker>,
    store: Arc<dyn ContentStore>,
    mood: Arc<MoodHandle>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        resolver: Arc<dyn ChannelResolver>,
        picker: Arc<ContentPicker>,
        store: Arc<dyn ContentStore>,
        mood: Arc<MoodHandle>,
        timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            picker,
            store,
            mood,
            timeout,
        }
    }

    /// Post one message for `rule`. Never returns an error; every failure is
    /// logged and reflected in the outcome and the dispatch log.
    pub async fn dispatch(&self, rule: &RuleConfig) -> DispatchOutcome {
        let Some(channel) = self.resolver.resolve() else {
            tracing::warn!(rule = %rule.name, "{}, skipping", VesperError::ChannelUnresolved);
            return DispatchOutcome::Skipped;
        };

        let picked = self.picker.pick_outcome(&rule.category).await;
        let pick_failed = picked.is_failed();
        let text = match &rule.prefix {
            Some(prefix) => format!("{}\n{}", prefix, picked.into_text()),
            None => picked.into_text(),
        };

        let outcome = match self.send(channel.as_ref(), &text).await {
            Ok(()) if !pick_failed => DispatchOutcome::Sent,
            Ok(()) => DispatchOutcome::Failed,
            Err(e) => {
                tracing::error!(rule = %rule.name, "Send failed: {:#}", e);
                DispatchOutcome::Failed
            }
        };
        tracing::info!(rule = %rule.name, category = %rule.category, ?outcome, "Dispatched");

        let record = DispatchRecord {
            rule: rule.name.clone(),
            timestamp: Utc::now(),
            mode: self.mood.snapshot().await.mode,
            status: if outcome == DispatchOutcome::Sent {
                DispatchStatus::Completed
            } else {
                DispatchStatus::Failed
            },
        };
        if let Err(e) = self.bounded_log(&record).await {
            tracing::error!(rule = %rule.name, "Failed to write dispatch log: {:#}", e);
        }
        outcome
    }

    /// Post fixed text, such as a silence announcement. Not logged as a
    /// dispatch.
    pub async fn announce(&self, text: &str) -> DispatchOutcome {
        let Some(channel) = self.resolver.resolve() else {
            tracing::warn!("{}, dropping announcement", VesperError::ChannelUnresolved);
            return DispatchOutcome::Skipped;
        };
        match self.send(channel.as_ref(), text).await {
            Ok(()) => DispatchOutcome::Sent,
            Err(e) => {
                tracing::error!("Announcement failed: {:#}", e);
                DispatchOutcome::Failed
            }
        }
    }

    async fn send(&self, channel: &dyn OutputChannel, text: &str) -> Result<()> {
        tokio::time::timeout(self.timeout, channel.send(text))
            .await
            .map_err(|_| VesperError::timeout("send", self.timeout))?
    }

    async fn bounded_log(&self, record: &DispatchRecord) -> Result<()> {
        tokio::time::timeout(self.timeout, self.store.append_dispatch(record))
            .await
            .map_err(|_| VesperError::timeout("dispatch log", self.timeout))?
    }
}
