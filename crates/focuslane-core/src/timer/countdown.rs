//! Drift-free countdown.
//!
//! Remaining time is always derived from an absolute start timestamp:
//!
//! ```text
//! remaining = clamp(segment - floor(now - started_at), 0, total)
//! ```
//!
//! Nothing is decremented per tick, so it does not matter how often (or
//! whether) the host observed the clock while it was suspended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    /// Full length of the phase in seconds.
    total_secs: u64,
    /// Remaining seconds when the current run segment began.
    segment_secs: u64,
    /// Start of the current run segment; `None` while frozen.
    started_at: Option<DateTime<Utc>>,
    /// Last observed remaining seconds.
    remaining_secs: u64,
}

impl Countdown {
    /// A frozen countdown holding `total_secs`.
    pub fn new(total_secs: u64) -> Self {
        Self {
            total_secs,
            segment_secs: total_secs,
            started_at: None,
            remaining_secs: total_secs,
        }
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    /// Remaining seconds as of the last observation.
    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    /// Run from the retained remaining time, starting at `now`.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.segment_secs = self.remaining_secs;
        self.started_at = Some(now);
    }

    /// Stop without re-deriving; the last observed value is kept.
    pub fn freeze(&mut self) {
        self.started_at = None;
    }

    /// Recompute and store the remaining time.
    pub fn observe(&mut self, now: DateTime<Utc>) -> u64 {
        self.remaining_secs = self.remaining_at(now);
        self.remaining_secs
    }

    /// Remaining time at `now` without mutating. Frozen countdowns return the
    /// retained value.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        let Some(started_at) = self.started_at else {
            return self.remaining_secs;
        };
        // Clock moving backwards counts as no time passed.
        let elapsed_ms = (now - started_at).num_milliseconds().max(0);
        let elapsed_secs = u64::try_from(elapsed_ms / 1000).unwrap_or(0);
        self.segment_secs
            .saturating_sub(elapsed_secs)
            .min(self.total_secs)
    }

    /// Instant the running segment reaches zero.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.segment_secs).ok()?;
        self.started_at
            .and_then(|t| t.checked_add_signed(chrono::Duration::seconds(secs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_000)
    }

    #[test]
    fn suspension_is_accounted_for() {
        let mut c = Countdown::new(1500);
        c.start(t0());
        assert_eq!(c.observe(t0() + Duration::seconds(600)), 900);
    }

    #[test]
    fn fractional_seconds_round_down_elapsed() {
        let mut c = Countdown::new(10);
        c.start(t0());
        assert_eq!(c.observe(t0() + Duration::milliseconds(999)), 10);
        assert_eq!(c.observe(t0() + Duration::milliseconds(1000)), 9);
    }

    #[test]
    fn backwards_clock_is_clamped() {
        let mut c = Countdown::new(60);
        c.start(t0());
        assert_eq!(c.observe(t0() - Duration::hours(3)), 60);
    }

    #[test]
    fn never_negative() {
        let mut c = Countdown::new(60);
        c.start(t0());
        assert_eq!(c.observe(t0() + Duration::days(400)), 0);
        assert_eq!(c.remaining_secs(), 0);
    }

    #[test]
    fn freeze_keeps_last_observed_value() {
        let mut c = Countdown::new(100);
        c.start(t0());
        c.observe(t0() + Duration::seconds(30));
        c.freeze();
        assert_eq!(c.remaining_at(t0() + Duration::seconds(90)), 70);
        assert_eq!(c.observe(t0() + Duration::seconds(90)), 70);

        c.start(t0() + Duration::seconds(200));
        assert_eq!(c.observe(t0() + Duration::seconds(210)), 60);
        assert_eq!(c.total_secs(), 100);
    }

    proptest! {
        #[test]
        fn remaining_matches_absolute_formula(
            total in 1u64..20_000,
            mut offsets in proptest::collection::vec(0i64..40_000_000, 1..40),
        ) {
            offsets.sort_unstable();
            let start = t0();
            let mut c = Countdown::new(total);
            c.start(start);
            for ms in offsets {
                let now = start + Duration::milliseconds(ms);
                let expected = total.saturating_sub((ms / 1000) as u64);
                prop_assert_eq!(c.observe(now), expected);
            }
        }

        #[test]
        fn observation_frequency_is_irrelevant(
            total in 1u64..5_000,
            end_ms in 0i64..6_000_000,
            step_ms in 1i64..120_000,
        ) {
            let start = t0();
            let mut ticked = Countdown::new(total);
            ticked.start(start);
            let mut ms = 0;
            while ms < end_ms {
                ticked.observe(start + Duration::milliseconds(ms));
                ms += step_ms;
            }
            let mut once = Countdown::new(total);
            once.start(start);
            let end = start + Duration::milliseconds(end_ms);
            prop_assert_eq!(ticked.observe(end), once.observe(end));
        }
    }
}
