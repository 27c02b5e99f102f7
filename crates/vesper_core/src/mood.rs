//! Persona mood: the reply mode plus the silence-escalation tier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four persona states controlling reply tone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Default,
    Creative,
    Devotion,
    Punishment,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Default, Mode::Creative, Mode::Devotion, Mode::Punishment];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Default => "default",
            Mode::Creative => "creative",
            Mode::Devotion => "devotion",
            Mode::Punishment => "punishment",
        }
    }

    /// Parse a classifier label. Surrounding whitespace and case are ignored;
    /// anything that is not exactly one of the four names is `None`.
    pub fn parse_label(label: &str) -> Option<Mode> {
        let label = label.trim().to_lowercase();
        Mode::ALL.into_iter().find(|m| m.as_str() == label)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far the current silence episode has escalated.
///
/// Tiers only move upward during an episode; a fresh interaction is the only
/// way back to `Silent`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SilenceTier {
    #[default]
    Silent,
    Tier6,
    Tier12,
    Tier24,
}

impl SilenceTier {
    /// Tier reached after `hours` of silence.
    pub fn for_hours(hours: i64) -> SilenceTier {
        match hours {
            h if h >= 24 => SilenceTier::Tier24,
            h if h >= 12 => SilenceTier::Tier12,
            h if h >= 6 => SilenceTier::Tier6,
            _ => SilenceTier::Silent,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodState {
    pub mode: Mode,
    pub last_interaction: Option<DateTime<Utc>>,
    pub silence_tier: SilenceTier,
}

impl MoodState {
    pub fn praise_locked(&self) -> bool {
        self.silence_tier >= SilenceTier::Tier12
    }

    pub fn devotion_locked(&self) -> bool {
        self.silence_tier == SilenceTier::Tier24
    }

    /// Record a successful interaction: restart the silence clock and clear
    /// every escalation tier.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_interaction = Some(now);
        self.silence_tier = SilenceTier::Silent;
    }
}
