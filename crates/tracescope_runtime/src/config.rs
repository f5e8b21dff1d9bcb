//! Playback configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback pacing and speed limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Minimum time between two advances, in milliseconds
    pub min_wait_ms: u64,
    /// Speed multiplier a new scheduler starts with
    pub default_speed: f64,
    /// Lowest speed reachable with [`crate::PlaybackScheduler::speed_down`]
    pub min_speed: f64,
    /// Highest speed reachable with [`crate::PlaybackScheduler::speed_up`]
    pub max_speed: f64,
    /// Increment used by speed up/down
    pub speed_step: f64,
    /// Substitute for non-positive speeds given to `set_speed`
    pub speed_floor: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            min_wait_ms: 400,
            default_speed: 1.0,
            min_speed: 0.25,
            max_speed: 4.0,
            speed_step: 0.25,
            speed_floor: 0.001,
        }
    }
}

impl PlaybackConfig {
    /// Set the minimum wait
    #[must_use]
    pub fn with_min_wait_ms(mut self, min_wait_ms: u64) -> Self {
        self.min_wait_ms = min_wait_ms;
        self
    }

    /// Set the starting speed
    #[must_use]
    pub fn with_default_speed(mut self, speed: f64) -> Self {
        self.default_speed = speed;
        self
    }

    /// Set the speed range used by speed up/down
    #[must_use]
    pub fn with_speed_range(mut self, min_speed: f64, max_speed: f64) -> Self {
        self.min_speed = min_speed;
        self.max_speed = max_speed;
        self
    }

    /// Minimum wait as a duration
    #[must_use]
    pub fn min_wait(&self) -> Duration {
        Duration::from_millis(self.min_wait_ms)
    }

    /// Replace a non-positive or non-finite speed with the floor
    #[must_use]
    pub fn sanitize_speed(&self, speed: f64) -> f64 {
        let floor = if self.speed_floor.is_finite() && self.speed_floor > 0.0 {
            self.speed_floor
        } else {
            0.001
        };
        if speed.is_finite() && speed > floor {
            speed
        } else if speed.is_infinite() && speed > 0.0 {
            f64::MAX
        } else {
            floor
        }
    }
}
