//! Progress rate limiting.
//!
//! A progress value is forwarded to the host when it moved by at least
//! `min_delta` since the last forwarded value, when it reaches 100, or when
//! `interval` passed since the last forward.

use std::cell::Cell;
use std::time::{Duration, Instant};

use serde::Deserialize;

/// Thresholds of a [`Throttle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Minimum change, in percentage points.
    pub min_delta: u32,
    /// Maximum silence, in milliseconds.
    pub interval_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_delta: 5,
            interval_ms: 3000,
        }
    }
}

/// Rate limiter state of one progress sub-stream.
#[derive(Debug)]
pub struct Throttle {
    min_delta: i64,
    interval: Duration,
    last_value: Cell<i64>,
    last_time: Cell<Instant>,
}

impl Throttle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            min_delta: i64::from(config.min_delta),
            interval: Duration::from_millis(config.interval_ms),
            last_value: Cell::new(0),
            last_time: Cell::new(Instant::now()),
        }
    }

    /// Start a new sub-stream now.
    pub fn reset(&self) {
        self.reset_at(Instant::now());
    }

    pub fn reset_at(&self, now: Instant) {
        self.last_value.set(0);
        self.last_time.set(now);
    }

    pub fn should_dispatch(&self, value: i64) -> bool {
        self.should_dispatch_at(value, Instant::now())
    }

    /// Decide whether `value` observed at `now` goes to the host. State only
    /// moves when the answer is `true`.
    pub fn should_dispatch_at(&self, value: i64, now: Instant) -> bool {
        let dispatch = (value - self.last_value.get()).abs() >= self.min_delta
            || value == 100
            || now.saturating_duration_since(self.last_time.get()) >= self.interval;
        if dispatch {
            self.last_value.set(value);
            self.last_time.set(now);
        }
        dispatch
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatched(throttle: &Throttle, start: Instant, values: &[i64]) -> Vec<i64> {
        values
            .iter()
            .copied()
            .filter(|v| throttle.should_dispatch_at(*v, start))
            .collect()
    }

    #[test]
    fn test_small_steps_are_suppressed() {
        let t = Throttle::default();
        let start = Instant::now();
        t.reset_at(start);
        assert_eq!(dispatched(&t, start, &[0, 3, 4, 5, 7, 100]), vec![5, 100]);
    }

    #[test]
    fn test_large_jump_dispatches() {
        let t = Throttle::default();
        let start = Instant::now();
        t.reset_at(start);
        assert_eq!(dispatched(&t, start, &[0, 5, 99, 100]), vec![5, 99, 100]);
    }

    #[test]
    fn test_hundred_always_dispatches() {
        let t = Throttle::default();
        let start = Instant::now();
        t.reset_at(start);
        assert!(t.should_dispatch_at(100, start));
        assert!(t.should_dispatch_at(100, start));
    }

    #[test]
    fn test_backwards_movement_counts() {
        let t = Throttle::default();
        let start = Instant::now();
        t.reset_at(start);
        assert!(t.should_dispatch_at(50, start));
        assert!(!t.should_dispatch_at(47, start));
        assert!(t.should_dispatch_at(45, start));
    }

    #[test]
    fn test_interval_elapsed_dispatches() {
        let t = Throttle::default();
        let start = Instant::now();
        t.reset_at(start);
        assert!(!t.should_dispatch_at(1, start + Duration::from_millis(2999)));
        assert!(t.should_dispatch_at(1, start + Duration::from_secs(3)));
        // The timer restarted on dispatch.
        assert!(!t.should_dispatch_at(2, start + Duration::from_secs(4)));
    }

    #[test]
    fn test_reset_restarts_from_zero() {
        let t = Throttle::default();
        let start = Instant::now();
        t.reset_at(start);
        assert!(t.should_dispatch_at(60, start));
        t.reset_at(start);
        assert!(!t.should_dispatch_at(2, start));
        assert!(t.should_dispatch_at(5, start));
    }
}
