//! Stale-input watchdog.

use std::time::{Duration, Instant};

use headput_common::config::TimeoutConfig;

use crate::engine::GestureEngine;

/// Polled check for a capture source that stopped sending samples.
#[derive(Debug, Clone, Copy)]
pub struct InputTimeoutMonitor {
    timeout: Duration,
}

impl InputTimeoutMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn from_config(config: &TimeoutConfig) -> Self {
        Self::new(config.input_timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether input last seen at `last_sample_at` is stale at `now`.
    pub fn is_stale(&self, last_sample_at: Option<Instant>, now: Instant) -> bool {
        last_sample_at.is_some_and(|last| now.saturating_duration_since(last) > self.timeout)
    }

    /// Flag the engine inactive if its input went stale.
    /// Returns `true` when this call made the transition.
    pub fn check(&self, engine: &mut GestureEngine, now: Instant) -> bool {
        if !engine.is_input_active() || !self.is_stale(engine.last_sample_at(), now) {
            return false;
        }
        tracing::warn!(
            timeout_ms = self.timeout.as_millis() as u64,
            "No samples received, treating input as lost"
        );
        engine.mark_input_inactive();
        true
    }
}

impl Default for InputTimeoutMonitor {
    fn default() -> Self {
        Self::from_config(&TimeoutConfig::default())
    }
}
