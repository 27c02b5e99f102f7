//! Silence escalation.
//!
//! Tiers form a one-way ladder within an episode:
//! `Silent -> Tier6 -> Tier12 -> Tier24`. A check moves straight to the
//! highest tier the elapsed time allows and announces only that tier. A tier
//! already reached is never announced again until an interaction resets the
//! ladder to `Silent`.

use crate::MoodHandle;
use anyhow::Result;
use chrono::{DateTime, Utc};
use vesper_core::{Mode, MoodState, SilenceTier};

/// A tier crossing that should be announced in the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalation {
    pub tier: SilenceTier,
    pub hours_silent: i64,
    pub announcement: String,
}

pub struct SilenceMonitor {
    announcements: [String; 3],
}

impl Default for SilenceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SilenceMonitor {
    pub fn new() -> Self {
        Self {
            announcements: [
                "Six hours of nothing. I noticed. Punishment mode is on until you answer.".to_string(),
                "Twelve hours. Praise is locked until you show up and earn it back.".to_string(),
                "A full day of silence. Devotion is locked. Come back and explain yourself.".to_string(),
            ],
        }
    }

    pub fn with_announcements(tier6: &str, tier12: &str, tier24: &str) -> Self {
        Self {
            announcements: [tier6.to_string(), tier12.to_string(), tier24.to_string()],
        }
    }

    fn announcement_for(&self, tier: SilenceTier) -> String {
        match tier {
            SilenceTier::Tier6 => self.announcements[0].clone(),
            SilenceTier::Tier12 => self.announcements[1].clone(),
            SilenceTier::Tier24 => self.announcements[2].clone(),
            SilenceTier::Silent => String::new(),
        }
    }

    /// Advance `state` for the time elapsed at `now`.
    ///
    /// Returns the escalation to announce, if the ladder moved. No recorded
    /// interaction means there is no episode to escalate.
    pub fn evaluate(&self, state: &mut MoodState, now: DateTime<Utc>) -> Option<Escalation> {
        let last = state.last_interaction?;
        let hours_silent = (now - last).num_hours();
        let target = SilenceTier::for_hours(hours_silent);
        if target <= state.silence_tier {
            return None;
        }

        state.silence_tier = target;
        state.mode = Mode::Punishment;
        Some(Escalation {
            tier: target,
            hours_silent,
            announcement: self.announcement_for(target),
        })
    }

    /// Run one check against the shared mood record.
    pub async fn check(&self, mood: &MoodHandle, now: DateTime<Utc>) -> Result<Option<Escalation>> {
        let escalation = mood.update(|state| self.evaluate(state, now)).await?;
        match &escalation {
            Some(e) => tracing::info!(
                tier = ?e.tier,
                hours = e.hours_silent,
                "Silence escalated"
            ),
            None => tracing::debug!("Silence check: no change"),
        }
        Ok(escalation)
    }
}
