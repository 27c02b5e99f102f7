use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vesper_core::InboundMessage;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "post_type")]
pub enum OneBotEvent {
    #[serde(rename = "message")]
    Message(MessageEvent),
    #[serde(rename = "meta_event")]
    Meta(MetaEvent),
    #[serde(rename = "notice")]
    Notice(serde_json::Value),
    #[serde(rename = "request")]
    Request(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    /// Account the implementation is logged in as.
    pub self_id: i64,
    pub message_type: String, // "private" or "group"
    #[serde(default)]
    pub sub_type: Option<String>,
    pub message_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub group_id: Option<i64>,
    pub raw_message: String,
    #[serde(default)]
    pub sender: Sender,
    pub time: i64,
}

impl MessageEvent {
    pub fn is_group(&self) -> bool {
        self.message_type == "group" && self.group_id.is_some()
    }

    /// Whether the bot should react: a group message in `group_id` from
    /// someone other than the bot itself.
    pub fn is_for(&self, group_id: Option<i64>) -> bool {
        self.user_id != self.self_id && self.is_group() && group_id.is_some() && self.group_id == group_id
    }

    pub fn into_inbound(self) -> InboundMessage {
        let source = match self.group_id {
            Some(group_id) => format!("onebot:group:{}", group_id),
            None => "onebot:private".to_string(),
        };
        let author = self
            .sender
            .nickname
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.user_id.to_string());
        InboundMessage {
            id: Uuid::new_v4(),
            source,
            author,
            body: self.raw_message,
            timestamp: self.time,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sender {
    pub user_id: Option<i64>,
    pub nickname: Option<String>,
    pub card: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "meta_event_type")]
pub enum MetaEvent {
    #[serde(rename = "heartbeat")]
    Heartbeat { time: i64, interval: i64 },
    #[serde(rename = "lifecycle")]
    Lifecycle { time: i64, sub_type: String },
}

#[derive(Debug, Serialize)]
pub struct SendMessageAction {
    pub action: String,
    pub params: SendMessageParams,
}

impl SendMessageAction {
    pub fn group(group_id: i64, message: &str) -> Self {
        Self {
            action: "send_group_msg".to_string(),
            params: SendMessageParams {
                message_type: "group".to_string(),
                group_id,
                message: message.to_string(),
                auto_escape: true,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendMessageParams {
    pub message_type: String,
    pub group_id: i64,
    pub message: String,
    /// Send as plain text, not CQ codes.
    pub auto_escape: bool,
}
