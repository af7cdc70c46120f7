//! Airwatch - Environmental Telemetry Agent
//!
//! Firmware for a Raspberry Pi Pico W with a BME280, an SGP40 and an
//! SSD1306 OLED on one I2C bus. Samples once per reading interval, shows
//! the VOC index on a burn-in friendly duty cycle and publishes readings
//! over MQTT on a fixed cadence.

#![no_std]
#![no_main]

use core::cell::RefCell;

use cyw43_pio::{PioSpi, DEFAULT_CLOCK_DIVIDER};
use defmt::*;
use embassy_executor::Spawner;
use embassy_net::{Config as NetConfig, DhcpConfig, StackResources};
use embassy_rp::bind_interrupts;
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::i2c::{self, Blocking, I2c};
use embassy_rp::peripherals::{I2C0, PIO0};
use embassy_rp::pio::{InterruptHandler as PioInterruptHandler, Pio};
use embassy_time::Delay;
use embedded_hal_bus::i2c::RefCellDevice;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use airwatch_core::clock::ClockService;
use airwatch_core::config::{parse_config, AgentConfig};
use airwatch_core::display::DisplayPresenter;
use airwatch_core::orchestrator::Orchestrator;
use airwatch_core::publish::{PublishScheduler, RetryPolicy};
use airwatch_core::sensor::SensorSampler;
use airwatch_drivers::display::Ssd1306;
use airwatch_drivers::sensor::{Bme280Climate, Sgp40, VocIndex};

use crate::adapters::{ChannelTransport, EmbassyClock, SignalTimeSource};
use crate::tasks::AgentOrchestrator;

mod adapters;
mod channels;
mod tasks;

/// Embedded configuration (compiled into firmware)
/// Edit agent.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../agent.toml");

/// I2C bus speed shared by all three devices
const I2C_FREQUENCY_HZ: u32 = 400_000;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});

static AGENT_CONFIG: StaticCell<AgentConfig> = StaticCell::new();
static I2C_BUS: StaticCell<RefCell<I2c<'static, I2C0, Blocking>>> = StaticCell::new();
static CYW43_STATE: StaticCell<cyw43::State> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Airwatch firmware starting...");

    let p = embassy_rp::init(Default::default());

    let config = AGENT_CONFIG.init(load_config());
    let config: &'static AgentConfig = config;

    // WiFi chip on the Pico W: power on GP23, PIO SPI on GP24/GP25/GP29
    let fw = include_bytes!("../cyw43-firmware/43439A0.bin");
    let clm = include_bytes!("../cyw43-firmware/43439A0_clm.bin");

    let pwr = Output::new(p.PIN_23, Level::Low);
    let cs = Output::new(p.PIN_25, Level::High);
    let mut pio = Pio::new(p.PIO0, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        p.PIN_24,
        p.PIN_29,
        p.DMA_CH0,
    );

    let state = CYW43_STATE.init(cyw43::State::new());
    let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, fw).await;
    spawner.spawn(tasks::cyw43_task(runner)).unwrap();

    control.init(clm).await;
    control
        .set_power_management(cyw43::PowerManagementMode::PowerSave)
        .await;

    let mut dhcp = DhcpConfig::default();
    dhcp.hostname = heapless::String::try_from(config.broker.client_id.as_str()).ok();

    let mut rng = RoscRng;
    let seed = rng.next_u64();
    let (stack, net_runner) = embassy_net::new(
        net_device,
        NetConfig::dhcpv4(dhcp),
        NET_RESOURCES.init(StackResources::new()),
        seed,
    );
    spawner.spawn(tasks::net_task(net_runner)).unwrap();
    info!("Network stack initialized");

    // Sensors and display share I2C0 on GP4 (SDA) / GP5 (SCL)
    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = I2C_FREQUENCY_HZ;
    let bus = I2C_BUS.init(RefCell::new(I2c::new_blocking(
        p.I2C0, p.PIN_5, p.PIN_4, i2c_config,
    )));

    let orchestrator = build_orchestrator(config, bus);
    info!("Agent assembled");

    spawner
        .spawn(tasks::network_task(control, stack, config))
        .unwrap();
    spawner
        .spawn(tasks::agent_task(orchestrator, config))
        .unwrap();
}

/// Parse and validate the embedded configuration
///
/// An invalid configuration halts the device before the loop starts.
fn load_config() -> AgentConfig {
    let config = match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => config,
        Err(e) => defmt::panic!("Failed to parse agent.toml: {}", e),
    };

    if let Err(e) = config.validate() {
        defmt::panic!("Invalid configuration: {}", e);
    }

    info!(
        "Configuration loaded: publish every {}s, UTC offset {}h",
        config.schedule.publish_interval_s, config.clock.tz_offset_hours
    );
    config
}

/// Wire the drivers into the core loop
///
/// Device init failures are logged and left to surface as per-tick errors.
fn build_orchestrator(
    config: &'static AgentConfig,
    bus: &'static RefCell<I2c<'static, I2C0, Blocking>>,
) -> AgentOrchestrator {
    let mut climate = Bme280Climate::new(RefCellDevice::new(bus), Delay);
    if let Err(e) = climate.init() {
        warn!("BME280 init failed: {}", e);
    }

    let sampling_interval_s = config.schedule.reading_interval_ms as f32 / 1000.0;
    let mut gas = Sgp40::new(
        RefCellDevice::new(bus),
        Delay,
        VocIndex::new(sampling_interval_s),
    );
    if let Err(e) = gas.self_test() {
        warn!("SGP40 self test failed: {}", e);
    }

    let mut display = Ssd1306::new(RefCellDevice::new(bus));
    if let Err(e) = display.init() {
        warn!("SSD1306 init failed: {}", e);
    }

    let clock = ClockService::new(EmbassyClock, config.clock.tz_offset_hours)
        .with_resync_interval(config.clock.resync_interval());

    let publisher = match PublishScheduler::new(
        ChannelTransport::new(),
        config.broker.channel_id.as_str(),
        RetryPolicy::from_config(&config.schedule),
    ) {
        Ok(publisher) => publisher.with_timestamp(config.telemetry.include_timestamp),
        Err(e) => defmt::panic!("Cannot build publish topic: {}", e),
    };

    Orchestrator::new(
        clock,
        SignalTimeSource::new(),
        SensorSampler::new(climate, gas),
        DisplayPresenter::new(display),
        publisher,
    )
}
