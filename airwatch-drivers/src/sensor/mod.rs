//! Sensor drivers

pub mod climate;
pub mod sgp40;
pub mod voc;

pub use climate::Bme280Climate;
pub use sgp40::Sgp40;
pub use voc::VocIndex;
