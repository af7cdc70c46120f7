//! Hardware driver implementations
//!
//! Concrete implementations of the collaborator traits defined in
//! airwatch-core, all over blocking `embedded-hal` 1.0 I2C:
//!
//! - BME280 temperature/humidity (through the `bme280` crate)
//! - SGP40 VOC sensor with humidity/temperature compensation
//! - VOC index estimator fed by the SGP40 raw signal
//! - SSD1306 128x64 OLED framebuffer rendered with `embedded-graphics`

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod display;
pub mod sensor;

#[cfg(test)]
pub(crate) mod mock;
