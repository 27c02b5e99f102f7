//! Inbound routing: slash commands pick from a fixed category, everything
//! else goes to the responder.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use vesper_content::ContentPicker;
use vesper_mood::MoodHandle;
use vesper_reasoning::Responder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Summon,
    Devotion,
    TechTip,
}

impl Command {
    /// Command named by the first word of `text`, if any.
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        match first.to_lowercase().as_str() {
            "/summon" => Some(Command::Summon),
            "/devotion" => Some(Command::Devotion),
            "/techtip" => Some(Command::TechTip),
            _ => None,
        }
    }

    pub fn category(self) -> &'static str {
        match self {
            Command::Summon => "Random Summons",
            Command::Devotion => "Devotion",
            Command::TechTip => "Tech Tips",
        }
    }
}

pub struct InboundRouter {
    picker: Arc<ContentPicker>,
    responder: Arc<Responder>,
    mood: Arc<MoodHandle>,
}

impl InboundRouter {
    pub fn new(picker: Arc<ContentPicker>, responder: Arc<Responder>, mood: Arc<MoodHandle>) -> Self {
        Self {
            picker,
            responder,
            mood,
        }
    }

    /// Reply text for one inbound message.
    pub async fn handle(&self, text: &str) -> String {
        self.handle_at(text, Utc::now()).await
    }

    pub async fn handle_at(&self, text: &str, now: DateTime<Utc>) -> String {
        match Command::parse(text) {
            Some(cmd) => {
                tracing::info!(command = ?cmd, "Command received");
                let reply = self.picker.pick(cmd.category()).await;
                // Any command ends the silence episode
                if let Err(e) = self.mood.update(|s| s.touch(now)).await {
                    tracing::error!("Failed to persist interaction time: {:#}", e);
                }
                reply
            }
            None => self.responder.respond_at(text, now).await.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(Command::parse("/summon"), Some(Command::Summon));
        assert_eq!(Command::parse("  /Devotion please"), Some(Command::Devotion));
        assert_eq!(Command::parse("/techtip"), Some(Command::TechTip));
    }

    #[test]
    fn test_unknown_or_embedded_is_not_command() {
        assert_eq!(Command::parse("/dance"), None);
        assert_eq!(Command::parse("please /summon"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn test_command_categories() {
        assert_eq!(Command::Summon.category(), "Random Summons");
        assert_eq!(Command::Devotion.category(), "Devotion");
        assert_eq!(Command::TechTip.category(), "Tech Tips");
    }
}
