//! Background tasks: one per rule, plus the silence monitor.

use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::recurrence::{is_due, local_instant, plan_window};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use vesper_core::config::{Recurrence, RuleConfig};
use vesper_mood::{MoodHandle, SilenceMonitor};

/// Once-per-day bookkeeping for a polled rule.
#[derive(Debug, Clone)]
pub struct TickRule {
    rule: RuleConfig,
    last_fired: Option<NaiveDate>,
}

impl TickRule {
    pub fn new(rule: RuleConfig) -> Self {
        Self {
            rule,
            last_fired: None,
        }
    }

    pub fn rule(&self) -> &RuleConfig {
        &self.rule
    }

    pub fn last_fired(&self) -> Option<NaiveDate> {
        self.last_fired
    }

    pub fn is_due(&self, now: DateTime<Tz>) -> bool {
        is_due(&self.rule.recurrence, now, self.last_fired)
    }

    /// Evaluate at `now` and dispatch when due. A skipped dispatch (no
    /// channel) does not use up the day.
    pub async fn poll(&mut self, now: DateTime<Tz>, dispatcher: &Dispatcher) -> Option<DispatchOutcome> {
        if !self.is_due(now) {
            return None;
        }
        let outcome = dispatcher.dispatch(&self.rule).await;
        if outcome != DispatchOutcome::Skipped {
            self.last_fired = Some(now.date_naive());
        }
        Some(outcome)
    }
}

/// Start the task that drives `rule` for the life of the process.
pub fn spawn_rule(
    rule: RuleConfig,
    tz: Tz,
    tick: Duration,
    dispatcher: Arc<Dispatcher>,
) -> JoinHandle<()> {
    tracing::info!(rule = %rule.name, recurrence = ?rule.recurrence, "Scheduling rule");
    match rule.recurrence {
        Recurrence::MultiDrop { .. } => tokio::spawn(run_multi_drop(rule, tz, dispatcher)),
        _ => tokio::spawn(run_tick_rule(TickRule::new(rule), tz, tick, dispatcher)),
    }
}

async fn run_tick_rule(mut rule: TickRule, tz: Tz, tick: Duration, dispatcher: Arc<Dispatcher>) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let now = Utc::now().with_timezone(&tz);
        if let Some(outcome) = rule.poll(now, &dispatcher).await {
            tracing::debug!(rule = %rule.rule().name, ?outcome, "Tick rule fired");
        }
    }
}

async fn run_multi_drop(rule: RuleConfig, tz: Tz, dispatcher: Arc<Dispatcher>) {
    let Recurrence::MultiDrop { start_hour, .. } = rule.recurrence else {
        return;
    };
    let mut day = Utc::now().with_timezone(&tz).date_naive();

    loop {
        let plan = {
            let mut rng = rand::thread_rng();
            plan_window(&mut rng, &tz, day, &rule.recurrence, Utc::now())
        };
        match plan {
            Some(plan) => {
                tracing::info!(
                    rule = %rule.name,
                    day = %plan.day,
                    drawn = plan.drawn,
                    upcoming = plan.instants.len(),
                    "Planned drops"
                );
                for at in plan.instants {
                    sleep_until(at).await;
                    dispatcher.dispatch(&rule).await;
                }
            }
            None => tracing::warn!(rule = %rule.name, %day, "Could not plan window"),
        }

        let Some(next_day) = day.succ_opt() else {
            tracing::error!(rule = %rule.name, "Calendar exhausted, stopping rule");
            return;
        };
        day = next_day;
        if let Some(next_start) = local_instant(&tz, day, start_hour, 0) {
            sleep_until(next_start.with_timezone(&Utc)).await;
        }
    }
}

async fn sleep_until(at: DateTime<Utc>) {
    let wait = (at - Utc::now()).to_std().unwrap_or_default();
    tokio::time::sleep(wait).await;
}

/// Start the periodic silence check. Announcements go out through the
/// dispatcher, so an unresolved channel is a logged skip.
pub fn spawn_silence_monitor(
    monitor: SilenceMonitor,
    mood: Arc<MoodHandle>,
    dispatcher: Arc<Dispatcher>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match monitor.check(&mood, Utc::now()).await {
                Ok(Some(escalation)) => {
                    dispatcher.announce(&escalation.announcement).await;
                }
                Ok(None) => {}
                Err(e) => tracing::error!("Silence check failed: {:#}", e),
            }
        }
    })
}
