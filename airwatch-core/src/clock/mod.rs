//! Clock service
//!
//! Monotonic time drives every interval; calendar time is derived from it
//! through an offset recorded at the last network sync.

pub mod calendar;
pub mod instant;
pub mod service;

pub use calendar::{CalendarTime, Weekday};
pub use instant::MonotonicInstant;
pub use service::{ClockService, ClockState};
