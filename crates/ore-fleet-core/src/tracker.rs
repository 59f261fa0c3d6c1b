// ABOUTME: Per-worker start and landed-transaction timestamps.
// ABOUTME: Derives startup latency and landing cadence from protocol events.

use crate::error::{FleetError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Timing derived from a landed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandedTiming {
    /// First landing since the worker started: time to first result.
    Startup(Duration),
    /// Time since the worker's previous landing.
    Cadence(Duration),
}

impl LandedTiming {
    pub fn elapsed(&self) -> Duration {
        match self {
            LandedTiming::Startup(d) | LandedTiming::Cadence(d) => *d,
        }
    }
}

#[derive(Debug, Default)]
struct Timestamps {
    started_at: HashMap<String, DateTime<Utc>>,
    last_landed_at: HashMap<String, DateTime<Utc>>,
}

/// Shared across every worker of one run.
///
/// Both maps live behind a single lock so each record operation observes and
/// mutates them atomically.
#[derive(Debug, Default)]
pub struct TimestampTracker {
    inner: Mutex<Timestamps>,
}

impl TimestampTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `worker` started mining. Returns true if it had started before.
    pub fn record_start(&self, worker: &str) -> bool {
        self.record_start_at(worker, Utc::now())
    }

    pub fn record_start_at(&self, worker: &str, now: DateTime<Utc>) -> bool {
        let mut state = self.lock();
        let again = state.started_at.insert(worker.to_string(), now).is_some();
        drop(state);

        if again {
            tracing::info!(worker = %worker, "{} launched mining again", worker);
        } else {
            tracing::info!(worker = %worker, "{} launched mining", worker);
        }
        again
    }

    /// Record a landed transaction for `worker`.
    ///
    /// The first landing measures time since start; every later one measures
    /// time since the previous landing. Landing without a recorded start is a
    /// protocol violation and leaves the tracker untouched.
    pub fn record_landed(&self, worker: &str) -> Result<LandedTiming> {
        self.record_landed_at(worker, Utc::now())
    }

    pub fn record_landed_at(&self, worker: &str, now: DateTime<Utc>) -> Result<LandedTiming> {
        let mut state = self.lock();

        let timing = match state.last_landed_at.get(worker) {
            Some(prev) => LandedTiming::Cadence(elapsed_between(*prev, now)),
            None => {
                let started = state.started_at.get(worker).ok_or_else(|| {
                    FleetError::LandedWithoutStart {
                        worker: worker.to_string(),
                    }
                })?;
                LandedTiming::Startup(elapsed_between(*started, now))
            }
        };

        state.last_landed_at.insert(worker.to_string(), now);
        drop(state);

        let elapsed = timing.elapsed();
        tracing::info!(
            worker = %worker,
            elapsed_secs = elapsed.as_secs_f64(),
            first = matches!(timing, LandedTiming::Startup(_)),
            "{} landed transaction in {} seconds",
            worker,
            elapsed.as_secs()
        );
        Ok(timing)
    }

    pub fn started_at(&self, worker: &str) -> Option<DateTime<Utc>> {
        self.lock().started_at.get(worker).copied()
    }

    pub fn last_landed_at(&self, worker: &str) -> Option<DateTime<Utc>> {
        self.lock().last_landed_at.get(worker).copied()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Timestamps> {
        // Every critical section leaves the maps consistent, so a poisoned
        // lock still holds valid data.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Clock skew can make `now` earlier than `from`; that reads as zero.
fn elapsed_between(from: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - from).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_715_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_record_start_reports_restart() {
        let tracker = TimestampTracker::new();
        assert!(!tracker.record_start_at("w1", at(0)));
        assert!(tracker.record_start_at("w1", at(5)));
        assert_eq!(tracker.started_at("w1"), Some(at(5)));
    }

    #[test]
    fn test_first_landed_measures_since_start() {
        let tracker = TimestampTracker::new();
        tracker.record_start_at("w1", at(0));

        let timing = tracker.record_landed_at("w1", at(42)).unwrap();
        assert_eq!(timing, LandedTiming::Startup(Duration::from_secs(42)));
        assert_eq!(tracker.last_landed_at("w1"), Some(at(42)));
    }

    #[test]
    fn test_later_landed_measures_since_previous_landed() {
        let tracker = TimestampTracker::new();
        tracker.record_start_at("w1", at(0));
        tracker.record_landed_at("w1", at(42)).unwrap();

        let timing = tracker.record_landed_at("w1", at(60)).unwrap();
        assert_eq!(timing, LandedTiming::Cadence(Duration::from_secs(18)));
        assert_eq!(tracker.last_landed_at("w1"), Some(at(60)));
    }

    #[test]
    fn test_landed_without_start_is_violation_and_leaves_state_unset() {
        let tracker = TimestampTracker::new();

        let err = tracker.record_landed_at("w1", at(3)).unwrap_err();
        assert!(matches!(
            err,
            FleetError::LandedWithoutStart { ref worker } if worker == "w1"
        ));
        assert_eq!(tracker.started_at("w1"), None);
        assert_eq!(tracker.last_landed_at("w1"), None);
    }

    #[test]
    fn test_restart_does_not_reset_cadence() {
        let tracker = TimestampTracker::new();
        tracker.record_start_at("w1", at(0));
        tracker.record_landed_at("w1", at(10)).unwrap();
        tracker.record_start_at("w1", at(20));

        let timing = tracker.record_landed_at("w1", at(25)).unwrap();
        assert_eq!(timing, LandedTiming::Cadence(Duration::from_secs(15)));
    }

    #[test]
    fn test_workers_are_tracked_independently() {
        let tracker = TimestampTracker::new();
        tracker.record_start_at("w1", at(0));
        tracker.record_start_at("w2", at(4));

        assert_eq!(
            tracker.record_landed_at("w2", at(10)).unwrap(),
            LandedTiming::Startup(Duration::from_secs(6))
        );
        assert_eq!(
            tracker.record_landed_at("w1", at(11)).unwrap(),
            LandedTiming::Startup(Duration::from_secs(11))
        );
        assert!(tracker.record_landed_at("w3", at(12)).is_err());
    }

    #[test]
    fn test_clock_skew_clamps_to_zero() {
        let tracker = TimestampTracker::new();
        tracker.record_start_at("w1", at(100));

        let timing = tracker.record_landed_at("w1", at(90)).unwrap();
        assert_eq!(timing, LandedTiming::Startup(Duration::ZERO));
    }

    #[test]
    fn test_wall_clock_gap_between_start_and_landed() {
        let tracker = TimestampTracker::new();
        tracker.record_start("w1");
        std::thread::sleep(Duration::from_millis(150));

        let elapsed = tracker.record_landed("w1").unwrap().elapsed();
        assert!(elapsed >= Duration::from_millis(150), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(1_000), "elapsed {:?}", elapsed);
    }

    #[test]
    fn test_wall_clock_second_landed_ignores_start() {
        let tracker = TimestampTracker::new();
        tracker.record_start("w1");
        std::thread::sleep(Duration::from_millis(300));
        tracker.record_landed("w1").unwrap();
        std::thread::sleep(Duration::from_millis(100));

        let timing = tracker.record_landed("w1").unwrap();
        assert!(matches!(timing, LandedTiming::Cadence(_)));
        assert!(timing.elapsed() >= Duration::from_millis(100));
        assert!(timing.elapsed() < Duration::from_millis(300));
    }
}
