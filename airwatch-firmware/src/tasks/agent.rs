//! Agent loop task
//!
//! Owns the orchestrator and the loop state. Drives one tick per reading
//! interval and logs every tick report.

use defmt::*;
use embassy_rp::i2c::{Blocking, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_time::{Delay, Duration, Instant, Ticker, Timer};
use embedded_hal_bus::i2c::RefCellDevice;

use airwatch_core::clock::MonotonicInstant;
use airwatch_core::config::AgentConfig;
use airwatch_core::orchestrator::{LoopState, Orchestrator, SampleStatus, TickReport};
use airwatch_core::publish::{AirQuality, PublishOutcome};
use airwatch_core::traits::ClockSyncError;
use airwatch_drivers::display::Ssd1306;
use airwatch_drivers::sensor::{Bme280Climate, Sgp40};

use crate::adapters::{ChannelTransport, EmbassyClock, SignalTimeSource};
use crate::channels::PUBLISH_FEEDBACK;

/// I2C0 shared by the sensors and the display
pub type SharedI2c = RefCellDevice<'static, I2c<'static, I2C0, Blocking>>;

pub type AgentOrchestrator = Orchestrator<
    EmbassyClock,
    SignalTimeSource,
    Bme280Climate<SharedI2c, Delay>,
    Sgp40<SharedI2c, Delay>,
    Ssd1306<SharedI2c>,
    ChannelTransport,
>;

/// Poll period while a time query is in flight
const SYNC_POLL: Duration = Duration::from_millis(100);

/// Give up on one startup time query after this long
const SYNC_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(15);

/// Pause between failed startup time queries
const SYNC_RETRY_PAUSE: Duration = Duration::from_secs(2);

/// Agent task - startup time sync, then the fixed-period loop
#[embassy_executor::task]
pub async fn agent_task(mut orchestrator: AgentOrchestrator, config: &'static AgentConfig) {
    info!("Agent task started");

    match initial_sync(&mut orchestrator, config.clock.sync_attempts).await {
        Ok(()) => info!(
            "Clock synced: {}",
            Display2Format(&orchestrator.clock().now_local())
        ),
        Err(e) => warn!("Clock not synced ({}), continuing without calendar time", e),
    }

    let start = MonotonicInstant::from_millis(Instant::now().as_millis());
    let mut state = match LoopState::from_config(config, start) {
        Ok(state) => state,
        Err(e) => {
            // validated in main, unreachable in practice
            error!("Invalid loop configuration: {}", e);
            return;
        }
    };

    let interval = Duration::from_millis(u64::from(config.schedule.reading_interval_ms));
    let mut ticker = Ticker::every(interval);

    loop {
        apply_feedback(&orchestrator, &mut state);

        let (next, report) = orchestrator.tick(state);
        state = next;
        log_report(&orchestrator, &state, &report);

        ticker.next().await;
    }
}

/// Bounded startup sync; `Pending` answers do not use up attempts
async fn initial_sync(
    orchestrator: &mut AgentOrchestrator,
    attempts: u8,
) -> Result<(), ClockSyncError> {
    let mut remaining = attempts.max(1);
    let mut deadline = Instant::now() + SYNC_ATTEMPT_TIMEOUT;

    loop {
        let error = match orchestrator.sync_clock() {
            Ok(()) => return Ok(()),
            Err(ClockSyncError::Pending) if Instant::now() < deadline => {
                Timer::after(SYNC_POLL).await;
                continue;
            }
            Err(ClockSyncError::Pending) => ClockSyncError::Timeout,
            Err(e) => e,
        };

        remaining -= 1;
        warn!("Time sync failed: {} ({} attempts left)", error, remaining);
        if remaining == 0 {
            return Err(error);
        }
        Timer::after(SYNC_RETRY_PAUSE).await;
        deadline = Instant::now() + SYNC_ATTEMPT_TIMEOUT;
    }
}

/// Feed delivery results from the network task back into the schedule
fn apply_feedback(orchestrator: &AgentOrchestrator, state: &mut LoopState) {
    while let Ok(result) = PUBLISH_FEEDBACK.try_receive() {
        match result {
            Ok(()) => {
                info!("Reading delivered to broker");
                orchestrator.record_delivery_success(state);
            }
            Err(e) => {
                orchestrator.record_delivery_failure(state);
                warn!(
                    "Delivery failed: {} (retry {} of {}, next attempt at {}s)",
                    e,
                    state.schedule.retries_used(),
                    orchestrator.publisher().policy().max_retries,
                    state.schedule.next_due().as_secs()
                );
            }
        }
    }
}

fn log_report(orchestrator: &AgentOrchestrator, state: &LoopState, report: &TickReport) {
    match report.sample {
        SampleStatus::Fresh => {
            if let Some(reading) = &state.last_reading {
                debug!(
                    "tick {}: {}C {}% voc {} ({}) raw {}",
                    report.tick,
                    reading.temperature_c,
                    reading.humidity_pct,
                    reading.voc_index,
                    AirQuality::from_voc_index(reading.voc_index).as_str(),
                    reading.raw_gas
                );
            }
        }
        SampleStatus::Stale(e) => {
            warn!("tick {}: sensor error {}, keeping last reading", report.tick, e)
        }
        SampleStatus::Missing(e) => warn!("tick {}: sensor error {}, no reading yet", report.tick, e),
    }

    if let Err(e) = report.display {
        warn!("tick {}: display error {}", report.tick, e);
    }

    match report.publish {
        Some(Ok(PublishOutcome::Published { next_due, delivery })) => info!(
            "tick {}: publish {}, next due at {}s",
            report.tick,
            delivery,
            next_due.as_secs()
        ),
        Some(Err(e)) => warn!(
            "tick {}: publish failed: {}, next attempt at {}s",
            report.tick,
            e,
            state.schedule.next_due().as_secs()
        ),
        Some(Ok(PublishOutcome::NotDue)) | None => {}
    }

    match report.resync {
        Some(Ok(())) => info!(
            "Clock re-synced: {}",
            Display2Format(&orchestrator.clock().now_local())
        ),
        Some(Err(ClockSyncError::Pending)) => trace!("Time query in flight"),
        Some(Err(e)) => warn!("Clock re-sync failed: {}", e),
        None => {}
    }
}
