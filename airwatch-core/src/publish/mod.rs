//! Telemetry publishing
//!
//! Payload formatting and the interval scheduler that decides when a
//! reading goes out.

pub mod payload;
pub mod scheduler;

pub use payload::{compose_payload, topic, AirQuality, Payload, Topic};
pub use scheduler::{PublishOutcome, PublishSchedule, PublishScheduler, RetryPolicy};
