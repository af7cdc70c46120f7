//! Collaborator traits
//!
//! These traits define the interface between the agent loop and the
//! hardware/network implementations it drives. Every fallible call returns
//! an explicit `Result` the loop branches on.

pub mod clock;
pub mod display;
pub mod sensor;
pub mod transport;

pub use clock::{ClockSyncError, MonotonicClock, TimeSource};
pub use display::{DisplayBackend, DisplayError, TextRole};
pub use sensor::{ClimateSample, ClimateSensor, GasSensor, SensorError};
pub use transport::{Delivery, PublishError, TelemetryTransport};
