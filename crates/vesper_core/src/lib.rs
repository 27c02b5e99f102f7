pub mod config;
pub mod error;
pub mod mood;

pub use config::VesperConfig;
pub use error::VesperError;
pub use mood::{Mode, MoodState, SilenceTier};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A chat message received from the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: Uuid,
    pub source: String,
    pub author: String,
    pub body: String,
    pub timestamp: i64, // Unix timestamp
}

/// Where a content item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOrigin {
    Seed,
    Generated,
}

impl ItemOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemOrigin::Seed => "seed",
            ItemOrigin::Generated => "generated",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "generated" => ItemOrigin::Generated,
            _ => ItemOrigin::Seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub category: String,
    pub text: String,
    pub origin: ItemOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub category: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchStatus {
    Completed,
    Failed,
}

/// One scheduled post, as written to the dispatch log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub rule: String,
    pub timestamp: DateTime<Utc>,
    pub mode: Mode,
    pub status: DispatchStatus,
}

/// Normalized form used for category comparisons (trimmed, lowercase).
pub fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}

#[async_trait]
pub trait OutputChannel: Send + Sync {
    async fn send(&self, text: &str) -> anyhow::Result<()>;
}

/// Resolves the configured output target. `None` means the channel is
/// missing or misconfigured.
pub trait ChannelResolver: Send + Sync {
    fn resolve(&self) -> Option<Arc<dyn OutputChannel>>;
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn list_items(&self, category: &str) -> anyhow::Result<Vec<ContentItem>>;
    async fn append_item(&self, category: &str, text: &str, origin: ItemOrigin)
        -> anyhow::Result<()>;
    async fn list_usage(&self, category: &str) -> anyhow::Result<Vec<UsageRecord>>;
    async fn append_usage(&self, category: &str, text: &str) -> anyhow::Result<()>;
    async fn append_dispatch(&self, record: &DispatchRecord) -> anyhow::Result<()>;
}

#[async_trait]
pub trait MoodStore: Send + Sync {
    async fn load(&self) -> anyhow::Result<MoodState>;
    async fn save(&self, state: &MoodState) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ToneClassifier: Send + Sync {
    /// `Ok(None)` means the label was not one of the four modes.
    async fn classify(&self, text: &str) -> anyhow::Result<Option<Mode>>;
}
