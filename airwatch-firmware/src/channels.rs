//! Inter-task communication channels
//!
//! The agent loop never touches the network. Publish jobs go out to the
//! network task over [`PUBLISH_CHANNEL`]; delivery results and time samples
//! come back over [`PUBLISH_FEEDBACK`] and [`TIME_SYNC`].

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use airwatch_core::publish::{Payload, Topic};
use airwatch_core::traits::{ClockSyncError, PublishError};

/// Publish jobs waiting for the network task
const PUBLISH_CHANNEL_SIZE: usize = 2;

/// Delivery results waiting for the agent loop
const FEEDBACK_CHANNEL_SIZE: usize = 4;

/// One message for the broker, owned by whoever holds it
#[derive(Debug, Clone)]
pub struct PublishJob {
    pub topic: Topic,
    pub payload: Payload,
    pub retain: bool,
}

/// Publish jobs from the agent loop to the network task
pub static PUBLISH_CHANNEL: Channel<CriticalSectionRawMutex, PublishJob, PUBLISH_CHANNEL_SIZE> =
    Channel::new();

/// Outcome of each publish job, in the order the jobs were queued
pub static PUBLISH_FEEDBACK: Channel<
    CriticalSectionRawMutex,
    Result<(), PublishError>,
    FEEDBACK_CHANNEL_SIZE,
> = Channel::new();

/// Agent loop asks the network task for a time sample
pub static SYNC_REQUEST: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Result of the last time query: Unix seconds (UTC)
pub static TIME_SYNC: Signal<CriticalSectionRawMutex, Result<u64, ClockSyncError>> =
    Signal::new();
