//! Clock and rate utilities for the sample stream.
//!
//! Sample handling is anchored to a monotonic session epoch recorded when
//! the engine starts. This module provides:
//! - The session clock (monotonic + wall-clock anchor)
//! - A rate controller used to throttle per-frame diagnostics

use std::time::{Duration, Instant};

/// A session clock that provides monotonic timestamps relative to a fixed
/// epoch (the moment the session started).
#[derive(Debug, Clone)]
pub struct SessionClock {
    /// The instant the session started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl SessionClock {
    /// Create a new session clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a clock from a known epoch (for replaying recorded streams).
    pub fn from_epoch(epoch: Instant, wall: String) -> Self {
        Self {
            epoch,
            epoch_wall: wall,
        }
    }

    /// Nanoseconds between the epoch and `at` (zero if `at` precedes it).
    pub fn ns_at(&self, at: Instant) -> u64 {
        at.saturating_duration_since(self.epoch).as_nanos() as u64
    }

    /// Nanoseconds elapsed since session start.
    pub fn elapsed_ns(&self) -> u64 {
        self.ns_at(Instant::now())
    }

    /// Wall-clock time at session start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// The underlying epoch instant.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// The instant `offset` after the epoch.
    pub fn instant_at(&self, offset: Duration) -> Instant {
        self.epoch + offset
    }

    /// Convert an elapsed nanosecond value to seconds.
    pub fn ns_to_secs(ns: u64) -> f64 {
        ns as f64 / 1_000_000_000.0
    }
}

/// Rate controller for throttled work (e.g. diagnostics printed per frame).
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / u64::from(target_hz.max(1)),
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_offsets() {
        let clock = SessionClock::start();
        let later = clock.instant_at(Duration::from_millis(1500));
        assert_eq!(clock.ns_at(later), 1_500_000_000);
        assert!((SessionClock::ns_to_secs(clock.ns_at(later)) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_instant_before_epoch_saturates() {
        let earlier = Instant::now();
        let clock = SessionClock::from_epoch(earlier + Duration::from_secs(1), "x".to_string());
        assert_eq!(clock.ns_at(earlier), 0);
        assert_eq!(clock.epoch_wall(), "x");
    }

    #[test]
    fn test_rate_controller() {
        let mut ctrl = RateController::new(2);
        assert!(ctrl.should_tick(0)); // first tick always fires
        assert!(!ctrl.should_tick(100_000_000));
        assert!(ctrl.should_tick(500_000_000));
        assert_eq!(ctrl.interval_ns(), 500_000_000);
    }

    #[test]
    fn test_rate_controller_zero_hz_is_clamped() {
        let ctrl = RateController::new(0);
        assert_eq!(ctrl.interval_ns(), 1_000_000_000);
    }
}
