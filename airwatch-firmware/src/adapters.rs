//! Core collaborator traits backed by embassy primitives
//!
//! The core loop is synchronous; these adapters turn its blocking-style
//! calls into non-blocking hand-offs to the network task.

use embassy_time::Instant;
use heapless::String;

use airwatch_core::clock::MonotonicInstant;
use airwatch_core::traits::{
    ClockSyncError, Delivery, MonotonicClock, PublishError, TelemetryTransport, TimeSource,
};

use crate::channels::{PublishJob, PUBLISH_CHANNEL, SYNC_REQUEST, TIME_SYNC};

/// Monotonic clock on the embassy time driver
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl MonotonicClock for EmbassyClock {
    fn now(&self) -> MonotonicInstant {
        MonotonicInstant::from_millis(Instant::now().as_millis())
    }
}

/// Transport that queues messages for the network task
///
/// `connect` and `disconnect` are no-ops: the network task opens a clean
/// session per job.
#[derive(Debug, Default)]
pub struct ChannelTransport {
    _private: (),
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TelemetryTransport for ChannelTransport {
    fn connect(&mut self, _clean_session: bool) -> Result<(), PublishError> {
        Ok(())
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &str,
        retain: bool,
    ) -> Result<Delivery, PublishError> {
        let job = PublishJob {
            topic: String::try_from(topic).map_err(|_| PublishError::PayloadTooLarge)?,
            payload: String::try_from(payload).map_err(|_| PublishError::PayloadTooLarge)?,
            retain,
        };

        PUBLISH_CHANNEL
            .try_send(job)
            .map(|()| Delivery::Queued)
            .map_err(|_| PublishError::QueueFull)
    }

    fn disconnect(&mut self) {}
}

/// Time source answered asynchronously by the network task
///
/// The first call raises [`SYNC_REQUEST`] and reports `Pending`; later
/// calls report `Pending` until the network task signals [`TIME_SYNC`].
#[derive(Debug, Default)]
pub struct SignalTimeSource {
    in_flight: bool,
}

impl SignalTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimeSource for SignalTimeSource {
    fn fetch_unix_time(&mut self) -> Result<u64, ClockSyncError> {
        if let Some(result) = TIME_SYNC.try_take() {
            self.in_flight = false;
            return result;
        }

        if !self.in_flight {
            SYNC_REQUEST.signal(());
            self.in_flight = true;
        }
        Err(ClockSyncError::Pending)
    }
}
