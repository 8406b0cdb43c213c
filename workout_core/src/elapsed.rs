//! Session stopwatch.
//!
//! Elapsed time is recomputed from the start timestamp on every read instead of
//! being accumulated by ticks, so it stays correct after the host was suspended.

use chrono::{DateTime, Utc};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElapsedTimer {
    started_at: Option<DateTime<Utc>>,
}

impl ElapsedTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timer resuming from a previously recorded start
    pub fn resumed(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at: Some(started_at),
        }
    }

    /// Start the stopwatch unless it is already running.
    ///
    /// Returns the start timestamp in effect.
    pub fn start(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        *self.started_at.get_or_insert(now)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Whole seconds since start; zero when not started or if the clock went backwards
    pub fn elapsed_sec(&self, now: DateTime<Utc>) -> u64 {
        match self.started_at {
            Some(started) => {
                let millis = (now - started).num_milliseconds();
                if millis <= 0 {
                    0
                } else {
                    (millis / 1000) as u64
                }
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_not_started_is_zero() {
        let timer = ElapsedTimer::new();
        assert_eq!(timer.elapsed_sec(t0()), 0);
    }

    #[test]
    fn test_floor_of_wall_clock_delta() {
        let mut timer = ElapsedTimer::new();
        timer.start(t0());
        assert_eq!(timer.elapsed_sec(t0() + Duration::milliseconds(1999)), 1);
        assert_eq!(timer.elapsed_sec(t0() + Duration::minutes(5)), 300);
    }

    #[test]
    fn test_start_only_once() {
        let mut timer = ElapsedTimer::new();
        timer.start(t0());
        let kept = timer.start(t0() + Duration::minutes(10));
        assert_eq!(kept, t0());
    }

    #[test]
    fn test_self_corrects_after_suspension() {
        // No ticks between reads: a suspended host sees the full delta on wake
        let timer = ElapsedTimer::resumed(t0());
        assert_eq!(timer.elapsed_sec(t0() + Duration::hours(1)), 3600);
    }

    #[test]
    fn test_clock_skew_never_negative() {
        let timer = ElapsedTimer::resumed(t0());
        assert_eq!(timer.elapsed_sec(t0() - Duration::seconds(30)), 0);
    }
}
