//! Board-agnostic core logic for the Airwatch telemetry agent
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Collaborator traits (sensors, display backend, time source, transport)
//! - Clock service (monotonic time plus network-synced calendar time)
//! - Sensor sampler with compensation-order guarantees
//! - Visibility window (display burn-in duty cycle)
//! - Display presenter with a reused frame buffer
//! - Publish scheduler and telemetry payload formatting
//! - Loop orchestrator driving one tick over an explicit state record
//! - Configuration types, parsing and validation

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod clock;
pub mod config;
pub mod display;
pub mod orchestrator;
pub mod publish;
pub mod sensor;
pub mod traits;
pub mod visibility;
