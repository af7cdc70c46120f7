//! Sensor traits

use core::fmt;

/// Errors that can occur while sampling sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// I2C / bus communication failure
    Bus,
    /// Data checksum mismatch
    Crc,
    /// Sensor not initialized or still starting up
    NotReady,
    /// Reading outside the physically plausible range
    InvalidData,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Bus => f.write_str("sensor bus error"),
            SensorError::Crc => f.write_str("sensor checksum mismatch"),
            SensorError::NotReady => f.write_str("sensor not ready"),
            SensorError::InvalidData => f.write_str("implausible sensor data"),
        }
    }
}

/// Temperature and humidity from the primary sensor
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClimateSample {
    /// Degrees Celsius
    pub temperature_c: f32,
    /// Relative humidity, 0-100 %
    pub humidity_pct: f32,
}

/// Primary (climate) sensor
pub trait ClimateSensor {
    /// Take one temperature/humidity measurement
    fn read_climate(&mut self) -> Result<ClimateSample, SensorError>;
}

/// Secondary (gas) sensor
///
/// The raw measurement is compensated with the current temperature and
/// humidity, so callers must read the climate sensor first.
pub trait GasSensor {
    /// Measure the compensated raw gas signal
    fn measure_raw(&mut self, temperature_c: f32, humidity_pct: f32) -> Result<u16, SensorError>;

    /// Feed a raw value into the index algorithm and return the VOC index
    ///
    /// The algorithm is stateful; call it exactly once per raw measurement.
    fn voc_index(&mut self, raw: u16) -> u16;
}
