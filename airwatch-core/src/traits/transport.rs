//! Telemetry transport trait

use core::fmt;

/// Errors from a publish attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishError {
    /// Could not open a connection to the broker
    Connect,
    /// Broker refused the connection (bad credentials, unavailable)
    Rejected,
    /// Connection opened but the publish did not go through
    Publish,
    /// Topic or payload does not fit the packet buffer
    PayloadTooLarge,
    /// Hand-off queue to the network side is full
    QueueFull,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::Connect => f.write_str("broker connect failed"),
            PublishError::Rejected => f.write_str("broker rejected connection"),
            PublishError::Publish => f.write_str("publish failed"),
            PublishError::PayloadTooLarge => f.write_str("payload too large"),
            PublishError::QueueFull => f.write_str("publish queue full"),
        }
    }
}

/// Formatting into a fixed-capacity buffer only fails on overflow
impl From<fmt::Error> for PublishError {
    fn from(_: fmt::Error) -> Self {
        PublishError::PayloadTooLarge
    }
}

/// How far a successful publish got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Delivery {
    /// The broker has the message
    Delivered,
    /// Handed off to another task; the outcome is reported later
    Queued,
}

/// Connection to the telemetry broker
///
/// The scheduler opens a fresh session for every publish:
/// `connect(true)`, `publish(..)`, `disconnect()`.
pub trait TelemetryTransport {
    /// Open a broker session
    fn connect(&mut self, clean_session: bool) -> Result<(), PublishError>;

    /// Publish one message on the open session
    fn publish(
        &mut self,
        topic: &str,
        payload: &str,
        retain: bool,
    ) -> Result<Delivery, PublishError>;

    /// Close the session; best effort
    fn disconnect(&mut self);
}
