//! Time units recorded by the tracer.
//!
//! The tracer stamps every event with an absolute monotonic counter and the
//! gap since the previous event, both in nanoseconds. Neither value is used
//! for ordering; the delta only paces playback.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Absolute tracer timestamp in nanoseconds (monotonic, arbitrary origin)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TraceInstant(u64);

impl TraceInstant {
    /// Create from nanoseconds
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Get nanoseconds
    #[must_use]
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Delta since an earlier instant (saturates at zero)
    #[must_use]
    pub const fn delta_since(&self, earlier: TraceInstant) -> TraceDelta {
        TraceDelta(self.0.saturating_sub(earlier.0))
    }
}

impl std::fmt::Display for TraceInstant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// Gap between two consecutive events in nanoseconds
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TraceDelta(u64);

impl TraceDelta {
    /// Zero delta
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Create from nanoseconds
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Create from milliseconds
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    /// Get nanoseconds
    #[must_use]
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Convert to a wall-clock duration
    #[must_use]
    pub const fn as_duration(&self) -> Duration {
        Duration::from_nanos(self.0)
    }

    /// Scale by a playback speed multiplier
    ///
    /// Non-finite or non-positive speeds leave the delta unscaled.
    #[must_use]
    pub fn scaled(&self, speed: f64) -> Duration {
        if !speed.is_finite() || speed <= 0.0 {
            return self.as_duration();
        }
        self.as_duration().div_f64(speed)
    }
}

impl std::fmt::Display for TraceDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 >= 1_000_000 {
            write!(f, "{}ms", self.0 / 1_000_000)
        } else {
            write!(f, "{}ns", self.0)
        }
    }
}

impl From<Duration> for TraceDelta {
    fn from(value: Duration) -> Self {
        Self(u64::try_from(value.as_nanos()).unwrap_or(u64::MAX))
    }
}
