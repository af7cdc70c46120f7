//! SGP40 VOC sensor driver
//!
//! Sensirion I2C protocol: 16-bit big-endian words, each followed by a
//! CRC-8 (poly 0x31, init 0xFF). A raw measurement takes relative
//! humidity and temperature as compensation words.

use airwatch_core::traits::{GasSensor, SensorError};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use super::voc::VocIndex;

/// Fixed I2C address
pub const SGP40_ADDR: u8 = 0x59;

/// SGP40 commands
mod cmd {
    pub const MEASURE_RAW: [u8; 2] = [0x26, 0x0F];
    pub const SELF_TEST: [u8; 2] = [0x28, 0x0E];
    pub const HEATER_OFF: [u8; 2] = [0x36, 0x15];
}

/// Measurement duration
const MEASURE_DELAY_MS: u32 = 30;

/// Self test duration
const SELF_TEST_DELAY_MS: u32 = 320;

/// Self test pass pattern
const SELF_TEST_OK: u16 = 0xD400;

/// Compensation words for 50 %RH and 25 °C
pub const DEFAULT_HUMIDITY_TICKS: u16 = 0x8000;
pub const DEFAULT_TEMPERATURE_TICKS: u16 = 0x6666;

/// Sensirion CRC-8 over a data word
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ 0x31;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Relative humidity to sensor ticks (`RH * 65535 / 100`)
pub fn humidity_ticks(humidity_pct: f32) -> u16 {
    let rh = humidity_pct.clamp(0.0, 100.0);
    (rh * 65535.0 / 100.0 + 0.5) as u16
}

/// Temperature to sensor ticks (`(T + 45) * 65535 / 175`)
pub fn temperature_ticks(temperature_c: f32) -> u16 {
    let t = temperature_c.clamp(-45.0, 130.0);
    ((t + 45.0) * 65535.0 / 175.0 + 0.5) as u16
}

/// Check the CRC of one word and return its value
fn read_word(bytes: &[u8; 3]) -> Result<u16, SensorError> {
    if crc8(&bytes[..2]) != bytes[2] {
        return Err(SensorError::Crc);
    }
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// SGP40 driver with an attached VOC index estimator
pub struct Sgp40<I2C, D> {
    i2c: I2C,
    delay: D,
    voc: VocIndex,
}

impl<I2C, D> Sgp40<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(i2c: I2C, delay: D, voc: VocIndex) -> Self {
        Self { i2c, delay, voc }
    }

    /// Raw VOC signal compensated for humidity and temperature
    pub fn measure_raw_signal(
        &mut self,
        humidity_pct: f32,
        temperature_c: f32,
    ) -> Result<u16, SensorError> {
        let rh = humidity_ticks(humidity_pct).to_be_bytes();
        let t = temperature_ticks(temperature_c).to_be_bytes();

        let command = [
            cmd::MEASURE_RAW[0],
            cmd::MEASURE_RAW[1],
            rh[0],
            rh[1],
            crc8(&rh),
            t[0],
            t[1],
            crc8(&t),
        ];
        self.i2c
            .write(SGP40_ADDR, &command)
            .map_err(|_| SensorError::Bus)?;
        self.delay.delay_ms(MEASURE_DELAY_MS);

        self.read_response()
    }

    /// Run the built-in self test
    pub fn self_test(&mut self) -> Result<(), SensorError> {
        self.i2c
            .write(SGP40_ADDR, &cmd::SELF_TEST)
            .map_err(|_| SensorError::Bus)?;
        self.delay.delay_ms(SELF_TEST_DELAY_MS);

        match self.read_response()? {
            SELF_TEST_OK => Ok(()),
            _ => Err(SensorError::NotReady),
        }
    }

    /// Stop the hotplate until the next measurement
    pub fn heater_off(&mut self) -> Result<(), SensorError> {
        self.i2c
            .write(SGP40_ADDR, &cmd::HEATER_OFF)
            .map_err(|_| SensorError::Bus)
    }

    pub fn voc(&self) -> &VocIndex {
        &self.voc
    }

    fn read_response(&mut self) -> Result<u16, SensorError> {
        let mut buf = [0u8; 3];
        self.i2c
            .read(SGP40_ADDR, &mut buf)
            .map_err(|_| SensorError::Bus)?;
        read_word(&buf)
    }
}

impl<I2C, D> GasSensor for Sgp40<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    fn measure_raw(&mut self, temperature_c: f32, humidity_pct: f32) -> Result<u16, SensorError> {
        self.measure_raw_signal(humidity_pct, temperature_c)
    }

    fn voc_index(&mut self, raw: u16) -> u16 {
        self.voc.process(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDelay, MockI2c};

    fn sensor(i2c: MockI2c) -> Sgp40<MockI2c, MockDelay> {
        Sgp40::new(i2c, MockDelay::default(), VocIndex::new(1.0))
    }

    fn word(value: u16) -> [u8; 3] {
        let b = value.to_be_bytes();
        [b[0], b[1], crc8(&b)]
    }

    #[test]
    fn test_crc8() {
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
        assert_eq!(crc8(&[0x80, 0x00]), 0xA2);
        assert_eq!(crc8(&[0x66, 0x66]), 0x93);
    }

    #[test]
    fn test_compensation_ticks() {
        assert_eq!(humidity_ticks(50.0), DEFAULT_HUMIDITY_TICKS);
        assert_eq!(temperature_ticks(25.0), DEFAULT_TEMPERATURE_TICKS);
        assert_eq!(humidity_ticks(0.0), 0);
        assert_eq!(humidity_ticks(120.0), 0xFFFF);
        assert_eq!(temperature_ticks(-50.0), 0);
        assert_eq!(temperature_ticks(130.0), 0xFFFF);
    }

    #[test]
    fn test_measure_raw_command() {
        let mut i2c = MockI2c::default();
        i2c.respond(&word(30_000));
        let mut sgp = sensor(i2c);

        let raw = sgp.measure_raw(25.0, 50.0).unwrap();
        assert_eq!(raw, 30_000);

        let (addr, bytes) = &sgp.i2c.writes[0];
        assert_eq!(*addr, SGP40_ADDR);
        assert_eq!(
            bytes.as_slice(),
            &[0x26, 0x0F, 0x80, 0x00, 0xA2, 0x66, 0x66, 0x93]
        );
        assert_eq!(sgp.delay.total_ns, 30_000_000);
    }

    #[test]
    fn test_bad_crc() {
        let mut i2c = MockI2c::default();
        i2c.respond(&[0x75, 0x30, 0x00]);
        let mut sgp = sensor(i2c);

        assert_eq!(sgp.measure_raw(25.0, 50.0), Err(SensorError::Crc));
    }

    #[test]
    fn test_bus_error() {
        let i2c = MockI2c {
            fail: true,
            ..Default::default()
        };
        let mut sgp = sensor(i2c);
        assert_eq!(sgp.measure_raw(25.0, 50.0), Err(SensorError::Bus));
    }

    #[test]
    fn test_self_test() {
        let mut i2c = MockI2c::default();
        i2c.respond(&word(SELF_TEST_OK));
        i2c.respond(&word(0x4B00));
        let mut sgp = sensor(i2c);

        assert_eq!(sgp.self_test(), Ok(()));
        assert_eq!(sgp.self_test(), Err(SensorError::NotReady));
        assert_eq!(sgp.i2c.writes[0].1.as_slice(), &cmd::SELF_TEST);
    }

    #[test]
    fn test_voc_index_uses_estimator() {
        let mut sgp = sensor(MockI2c::default());
        // Still in warm-up
        assert_eq!(sgp.voc_index(30_000), 0);
        assert_eq!(sgp.voc().samples(), 1);
    }
}
