//! Time traits

use core::fmt;

use crate::clock::MonotonicInstant;

/// Errors from a calendar time source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSyncError {
    /// Network or time server unreachable
    Unreachable,
    /// No response within the source's timeout
    Timeout,
    /// Response could not be decoded
    MalformedResponse,
    /// An asynchronous query has not produced a result yet
    Pending,
}

impl fmt::Display for ClockSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockSyncError::Unreachable => f.write_str("time source unreachable"),
            ClockSyncError::Timeout => f.write_str("time source timed out"),
            ClockSyncError::MalformedResponse => f.write_str("malformed time response"),
            ClockSyncError::Pending => f.write_str("time query pending"),
        }
    }
}

/// Strictly non-decreasing device clock
///
/// Implementations must never jump backwards and must be unaffected by
/// calendar adjustments.
pub trait MonotonicClock {
    /// Current monotonic time
    fn now(&self) -> MonotonicInstant;
}

/// Source of absolute (calendar) time, typically a network time server
pub trait TimeSource {
    /// Fetch the current time as seconds since the Unix epoch (UTC)
    fn fetch_unix_time(&mut self) -> Result<u64, ClockSyncError>;
}
