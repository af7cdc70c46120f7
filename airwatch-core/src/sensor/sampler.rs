//! Sensor sampler
//!
//! The gas sensor's raw measurement is compensated with the current
//! temperature and humidity, so the climate sensor is always read first.

use super::reading::Reading;
use crate::clock::CalendarTime;
use crate::traits::{ClimateSensor, GasSensor, SensorError};

/// Combines the climate and gas sensors into one reading per tick
pub struct SensorSampler<C, G> {
    climate: C,
    gas: G,
}

impl<C: ClimateSensor, G: GasSensor> SensorSampler<C, G> {
    pub fn new(climate: C, gas: G) -> Self {
        Self { climate, gas }
    }

    /// Take one reading
    ///
    /// A climate failure returns before the gas sensor is touched.
    pub fn sample(&mut self, captured_at: CalendarTime) -> Result<Reading, SensorError> {
        let climate = self.climate.read_climate()?;

        let raw_gas = self
            .gas
            .measure_raw(climate.temperature_c, climate.humidity_pct)?;
        let voc_index = self.gas.voc_index(raw_gas);

        Ok(Reading {
            temperature_c: climate.temperature_c,
            humidity_pct: climate.humidity_pct,
            raw_gas,
            voc_index,
            captured_at,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use core::cell::RefCell;

    use heapless::Vec;

    use crate::traits::{ClimateSample, ClimateSensor, GasSensor, SensorError};

    /// Sensor call, in the order it happened
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum Call {
        Climate,
        GasRaw { temperature_c: f32, humidity_pct: f32 },
        GasIndex(u16),
    }

    pub type CallLog = RefCell<Vec<Call, 64>>;

    pub struct FakeClimate<'a> {
        pub log: &'a CallLog,
        pub result: Result<ClimateSample, SensorError>,
    }

    impl ClimateSensor for FakeClimate<'_> {
        fn read_climate(&mut self) -> Result<ClimateSample, SensorError> {
            let _ = self.log.borrow_mut().push(Call::Climate);
            self.result
        }
    }

    pub struct FakeGas<'a> {
        pub log: &'a CallLog,
        pub raw: Result<u16, SensorError>,
        pub index: u16,
    }

    impl GasSensor for FakeGas<'_> {
        fn measure_raw(&mut self, temperature_c: f32, humidity_pct: f32) -> Result<u16, SensorError> {
            let _ = self.log.borrow_mut().push(Call::GasRaw {
                temperature_c,
                humidity_pct,
            });
            self.raw
        }

        fn voc_index(&mut self, raw: u16) -> u16 {
            let _ = self.log.borrow_mut().push(Call::GasIndex(raw));
            self.index
        }
    }

    pub fn climate(temperature_c: f32, humidity_pct: f32) -> ClimateSample {
        ClimateSample {
            temperature_c,
            humidity_pct,
        }
    }
}
