//! Sensor sampling
//!
//! One [`Reading`] per tick from the climate and gas sensors.

pub mod reading;
pub mod sampler;

pub use reading::Reading;
pub use sampler::SensorSampler;
