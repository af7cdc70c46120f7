//! BME280 climate sensor
//!
//! Wraps the `bme280` crate driver. Pressure is measured by the chip but
//! not used by the agent.

use ::bme280::i2c::BME280;
use airwatch_core::traits::{ClimateSample, ClimateSensor, SensorError};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

/// Default I2C address (SDO to GND)
pub const BME280_PRIMARY_ADDR: u8 = 0x76;

/// Operating range from the datasheet
const TEMPERATURE_RANGE_C: (f32, f32) = (-40.0, 85.0);

/// BME280 on I2C
pub struct Bme280Climate<I2C, D> {
    sensor: BME280<I2C>,
    delay: D,
    initialized: bool,
}

impl<I2C, D> Bme280Climate<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    /// Sensor at [`BME280_PRIMARY_ADDR`]
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            sensor: BME280::new_primary(i2c),
            delay,
            initialized: false,
        }
    }

    /// Load calibration data and configure oversampling
    pub fn init(&mut self) -> Result<(), SensorError> {
        self.sensor
            .init(&mut self.delay)
            .map_err(|_| SensorError::Bus)?;
        self.initialized = true;
        Ok(())
    }
}

impl<I2C, D> ClimateSensor for Bme280Climate<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    fn read_climate(&mut self) -> Result<ClimateSample, SensorError> {
        if !self.initialized {
            return Err(SensorError::NotReady);
        }
        let m = self
            .sensor
            .measure(&mut self.delay)
            .map_err(|_| SensorError::Bus)?;
        check_range(m.temperature, m.humidity)
    }
}

/// Reject values outside the chip's operating range
fn check_range(temperature_c: f32, humidity_pct: f32) -> Result<ClimateSample, SensorError> {
    let (t_min, t_max) = TEMPERATURE_RANGE_C;
    // NaN fails both comparisons
    let temperature_ok = temperature_c >= t_min && temperature_c <= t_max;
    let humidity_ok = (0.0..=100.0).contains(&humidity_pct);
    if !temperature_ok || !humidity_ok {
        return Err(SensorError::InvalidData);
    }
    Ok(ClimateSample {
        temperature_c,
        humidity_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDelay, MockI2c};

    #[test]
    fn test_check_range() {
        let sample = check_range(21.5, 40.0).unwrap();
        assert_eq!(sample.temperature_c, 21.5);
        assert_eq!(sample.humidity_pct, 40.0);

        assert_eq!(check_range(-41.0, 40.0), Err(SensorError::InvalidData));
        assert_eq!(check_range(20.0, 100.5), Err(SensorError::InvalidData));
        assert_eq!(check_range(f32::NAN, 40.0), Err(SensorError::InvalidData));
    }

    #[test]
    fn test_read_before_init() {
        let mut sensor = Bme280Climate::new(MockI2c::default(), MockDelay::default());
        assert_eq!(sensor.read_climate(), Err(SensorError::NotReady));
    }

    #[test]
    fn test_init_bus_failure() {
        let i2c = MockI2c {
            fail: true,
            ..Default::default()
        };
        let mut sensor = Bme280Climate::new(i2c, MockDelay::default());
        assert_eq!(sensor.init(), Err(SensorError::Bus));
    }
}
