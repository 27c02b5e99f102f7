//! Time predicates for scheduled rules.
//!
//! Everything here is pure: the caller supplies `now` and the rng, so the
//! rules can be tested without a clock.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use rand::Rng;
use vesper_core::config::Recurrence;

/// Minutes after a `Daily` or `Weekly` time during which a late tick still
/// fires the rule.
pub const CATCH_UP_MINUTES: u32 = 60;

/// Whether a tick rule should fire at `now`.
///
/// A rule fires at most once per local calendar day; `last_fired` is the
/// local date of its previous post. Timed rules fire on the first tick in
/// `[hour:minute, hour:minute + CATCH_UP_MINUTES)`, so a coarse tick or a
/// clock step does not lose the day. Multi-drop rules are planned, never
/// polled, so they are never due here.
pub fn is_due(recurrence: &Recurrence, now: DateTime<Tz>, last_fired: Option<NaiveDate>) -> bool {
    if last_fired == Some(now.date_naive()) {
        return false;
    }
    match *recurrence {
        Recurrence::Daily { hour, minute } => within_catch_up(now, hour, minute),
        Recurrence::Weekly {
            weekday,
            hour,
            minute,
        } => now.weekday() == weekday && within_catch_up(now, hour, minute),
        Recurrence::HourWindow {
            start_hour,
            end_hour,
        } => (start_hour..end_hour).contains(&now.hour()),
        Recurrence::MultiDrop { .. } => false,
    }
}

fn within_catch_up(now: DateTime<Tz>, hour: u32, minute: u32) -> bool {
    let at = now.hour() * 60 + now.minute();
    let target = hour * 60 + minute;
    at >= target && at < target + CATCH_UP_MINUTES
}

/// Draw the drop offsets for one window: `N` in `[min_drops, max_drops]`
/// minutes in `[0, window_minutes]`, ascending.
pub fn plan_drops<R: Rng + ?Sized>(
    rng: &mut R,
    window_minutes: u32,
    min_drops: u32,
    max_drops: u32,
) -> Vec<u32> {
    let (lo, hi) = (min_drops.min(max_drops), min_drops.max(max_drops));
    let count = rng.gen_range(lo..=hi);
    let mut offsets: Vec<u32> = (0..count)
        .map(|_| rng.gen_range(0..=window_minutes))
        .collect();
    offsets.sort_unstable();
    offsets
}

/// `date hour:minute` in `tz`. A local time skipped by a DST jump resolves
/// to the hour after it.
pub fn local_instant(tz: &Tz, date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Tz>> {
    let naive = date.and_hms_opt(hour, minute, 0)?;
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}

/// One day's drops for a multi-drop rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropPlan {
    pub day: NaiveDate,
    pub window_start: DateTime<Utc>,
    /// Upcoming instants, ascending. Offsets already past at planning time
    /// are dropped.
    pub instants: Vec<DateTime<Utc>>,
    /// How many drops were drawn before filtering.
    pub drawn: usize,
}

/// Plan the window that opens at `start_hour` on `day`.
pub fn plan_window<R: Rng + ?Sized>(
    rng: &mut R,
    tz: &Tz,
    day: NaiveDate,
    recurrence: &Recurrence,
    now: DateTime<Utc>,
) -> Option<DropPlan> {
    let Recurrence::MultiDrop {
        start_hour,
        window_minutes,
        min_drops,
        max_drops,
    } = *recurrence
    else {
        return None;
    };

    let window_start = local_instant(tz, day, start_hour, 0)?.with_timezone(&Utc);
    let offsets = plan_drops(rng, window_minutes, min_drops, max_drops);
    let drawn = offsets.len();
    let instants = offsets
        .into_iter()
        .map(|m| window_start + Duration::minutes(i64::from(m)))
        .filter(|at| *at > now)
        .collect();

    Some(DropPlan {
        day,
        window_start,
        instants,
        drawn,
    })
}
