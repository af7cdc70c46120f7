//! Loop tick
//!
//! Order within a tick:
//! 1. re-sync the calendar clock if due (never fatal)
//! 2. capture monotonic and calendar time
//! 3. sample sensors; on failure the last reading stays for display only
//! 4. evaluate and advance the visibility window
//! 5. render the display
//! 6. check the publish schedule, with a fresh reading only
//!
//! Nothing fallible escapes a tick. Every outcome lands in the
//! [`TickReport`] for the caller to log.

use super::state::LoopState;
use crate::clock::{ClockService, MonotonicInstant};
use crate::display::DisplayPresenter;
use crate::publish::{PublishOutcome, PublishScheduler};
use crate::sensor::SensorSampler;
use crate::traits::{
    ClimateSensor, ClockSyncError, DisplayBackend, DisplayError, GasSensor, MonotonicClock,
    PublishError, SensorError, TelemetryTransport, TimeSource,
};

/// What the sampler produced this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleStatus {
    /// New reading taken
    Fresh,
    /// Sampling failed; the previous reading is on display
    Stale(SensorError),
    /// Sampling failed and there is no previous reading
    Missing(SensorError),
}

impl SampleStatus {
    pub fn error(&self) -> Option<SensorError> {
        match self {
            SampleStatus::Fresh => None,
            SampleStatus::Stale(e) | SampleStatus::Missing(e) => Some(*e),
        }
    }
}

/// Outcome of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// Tick number, starting at 0
    pub tick: u32,
    pub now: MonotonicInstant,
    pub sample: SampleStatus,
    pub visible: bool,
    pub display: Result<(), DisplayError>,
    /// `None` when there was no fresh reading to consider
    pub publish: Option<Result<PublishOutcome, PublishError>>,
    /// `None` when no re-sync was due
    pub resync: Option<Result<(), ClockSyncError>>,
}

impl TickReport {
    /// A publish went out this tick
    pub fn published(&self) -> bool {
        matches!(self.publish, Some(Ok(PublishOutcome::Published { .. })))
    }
}

/// Owns the collaborators and runs one tick at a time
pub struct Orchestrator<M, S, C, G, B, T> {
    clock: ClockService<M>,
    time_source: S,
    sampler: SensorSampler<C, G>,
    presenter: DisplayPresenter<B>,
    publisher: PublishScheduler<T>,
}

impl<M, S, C, G, B, T> Orchestrator<M, S, C, G, B, T>
where
    M: MonotonicClock,
    S: TimeSource,
    C: ClimateSensor,
    G: GasSensor,
    B: DisplayBackend,
    T: TelemetryTransport,
{
    pub fn new(
        clock: ClockService<M>,
        time_source: S,
        sampler: SensorSampler<C, G>,
        presenter: DisplayPresenter<B>,
        publisher: PublishScheduler<T>,
    ) -> Self {
        Self {
            clock,
            time_source,
            sampler,
            presenter,
            publisher,
        }
    }

    /// Run one tick
    pub fn tick(&mut self, state: LoopState) -> (LoopState, TickReport) {
        let mut state = state;

        let resync = if self.clock.resync_due(self.clock.now_monotonic()) {
            Some(self.clock.sync_now(&mut self.time_source))
        } else {
            None
        };

        let now = self.clock.now_monotonic();
        let captured_at = self.clock.now_local();
        let synced = self.clock.is_synced();

        let sample = match self.sampler.sample(captured_at) {
            Ok(reading) => {
                state.last_reading = Some(reading);
                SampleStatus::Fresh
            }
            Err(e) if state.last_reading.is_some() => SampleStatus::Stale(e),
            Err(e) => SampleStatus::Missing(e),
        };

        let visible = state.visibility.tick();
        state.visibility.advance();

        let display = self
            .presenter
            .render(state.last_reading.as_ref(), visible, synced);

        let publish = match (sample, state.last_reading.as_ref()) {
            (SampleStatus::Fresh, Some(reading)) => Some(self.publisher.maybe_publish_at(
                &mut state.schedule,
                reading,
                now,
                synced,
            )),
            _ => None,
        };

        let report = TickReport {
            tick: state.tick,
            now,
            sample,
            visible,
            display,
            publish,
            resync,
        };
        state.tick = state.tick.wrapping_add(1);

        (state, report)
    }

    /// Single calendar sync attempt, for startup
    pub fn sync_clock(&mut self) -> Result<(), ClockSyncError> {
        self.clock.sync_now(&mut self.time_source)
    }

    /// Bounded calendar sync attempts, for startup
    pub fn sync_clock_with_retry(&mut self, attempts: u8) -> Result<(), ClockSyncError> {
        self.clock.sync_with_retry(&mut self.time_source, attempts)
    }

    /// A queued publish failed on the network side
    pub fn record_delivery_failure(&self, state: &mut LoopState) {
        let now = self.clock.now_monotonic();
        self.publisher
            .record_delivery_failure(&mut state.schedule, now);
    }

    /// A queued publish reached the broker
    pub fn record_delivery_success(&self, state: &mut LoopState) {
        self.publisher.record_delivery_success(&mut state.schedule);
    }

    pub fn clock(&self) -> &ClockService<M> {
        &self.clock
    }

    pub fn presenter(&self) -> &DisplayPresenter<B> {
        &self.presenter
    }

    pub fn publisher(&self) -> &PublishScheduler<T> {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut PublishScheduler<T> {
        &mut self.publisher
    }
}
