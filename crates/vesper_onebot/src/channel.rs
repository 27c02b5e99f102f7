use crate::client::OneBotClient;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use vesper_core::{ChannelResolver, OutputChannel};

/// Posts into one OneBot group.
pub struct OneBotChannel {
    client: OneBotClient,
    group_id: i64,
}

impl OneBotChannel {
    pub fn new(client: OneBotClient, group_id: i64) -> Self {
        Self { client, group_id }
    }
}

#[async_trait]
impl OutputChannel for OneBotChannel {
    async fn send(&self, text: &str) -> Result<()> {
        self.client.send_group_message(self.group_id, text).await
    }
}

/// Resolves to the configured group, or to nothing when OneBot or the group
/// id is not configured.
pub struct OneBotResolver {
    channel: Option<Arc<OneBotChannel>>,
}

impl OneBotResolver {
    pub fn new(client: Option<OneBotClient>, group_id: Option<i64>) -> Self {
        let channel = match (client, group_id) {
            (Some(client), Some(group_id)) => Some(Arc::new(OneBotChannel::new(client, group_id))),
            _ => None,
        };
        Self { channel }
    }

    pub fn unresolved() -> Self {
        Self { channel: None }
    }
}

impl ChannelResolver for OneBotResolver {
    fn resolve(&self) -> Option<Arc<dyn OutputChannel>> {
        self.channel.clone().map(|c| c as Arc<dyn OutputChannel>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_core::config::OneBotConfig;

    #[test]
    fn test_unconfigured_is_unresolved() {
        assert!(OneBotResolver::unresolved().resolve().is_none());
        assert!(OneBotResolver::new(None, Some(777)).resolve().is_none());
    }

    #[tokio::test]
    async fn test_missing_group_is_unresolved() {
        let config = OneBotConfig {
            ws_url: "ws://127.0.0.1:9".to_string(),
            access_token: None,
            group_id: None,
        };
        let (client, _rx) = OneBotClient::connect(&config).unwrap();
        assert!(OneBotResolver::new(Some(client.clone()), None).resolve().is_none());
        assert!(OneBotResolver::new(Some(client), Some(777)).resolve().is_some());
    }
}
