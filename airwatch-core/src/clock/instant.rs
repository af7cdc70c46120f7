//! Monotonic time points
//!
//! All interval and scheduling math in the agent uses [`MonotonicInstant`].
//! Calendar adjustments never touch it.

use core::ops::{Add, Sub};
use core::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point on the device's monotonic clock, in milliseconds since boot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MonotonicInstant {
    ms: u64,
}

impl MonotonicInstant {
    /// Boot time
    pub const ZERO: Self = Self { ms: 0 };

    /// Create an instant from milliseconds since boot
    pub const fn from_millis(ms: u64) -> Self {
        Self { ms }
    }

    /// Create an instant from whole seconds since boot
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            ms: secs.saturating_mul(1000),
        }
    }

    /// Milliseconds since boot
    pub const fn as_millis(&self) -> u64 {
        self.ms
    }

    /// Whole seconds since boot
    pub const fn as_secs(&self) -> u64 {
        self.ms / 1000
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later
    pub fn saturating_duration_since(&self, earlier: MonotonicInstant) -> Duration {
        Duration::from_millis(self.ms.saturating_sub(earlier.ms))
    }

    /// Add a duration, saturating at the far end of the clock
    pub fn saturating_add(&self, duration: Duration) -> Self {
        Self {
            ms: self.ms.saturating_add(duration_to_millis(duration)),
        }
    }
}

impl Add<Duration> for MonotonicInstant {
    type Output = MonotonicInstant;

    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sub<MonotonicInstant> for MonotonicInstant {
    type Output = Duration;

    fn sub(self, rhs: MonotonicInstant) -> Self::Output {
        self.saturating_duration_since(rhs)
    }
}

/// Clamp a duration to whole milliseconds that fit a u64
pub(crate) fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
