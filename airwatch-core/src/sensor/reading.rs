//! Per-tick sensor snapshot

use crate::clock::CalendarTime;

/// Immutable sensor snapshot taken once per tick
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    /// Compensated raw gas signal (sensor ticks)
    pub raw_gas: u16,
    /// Normalized VOC index
    pub voc_index: u16,
    pub captured_at: CalendarTime,
}

impl Reading {
    /// Temperature in degrees Fahrenheit
    pub fn temperature_f(&self) -> f32 {
        self.temperature_c * 1.8 + 32.0
    }
}
