//! Airwatch wire protocols
//!
//! Allocation-free codecs for the two network protocols the agent speaks:
//!
//! - **MQTT 3.1.1** control packets needed for fire-and-forget telemetry:
//!   CONNECT, CONNACK, PUBLISH (QoS 0) and DISCONNECT.
//! - **SNTP** (RFC 4330) client request and server response.
//!
//! Socket handling lives in the firmware; this crate only turns values
//! into bytes and back.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod mqtt;
pub mod sntp;

pub use mqtt::{ConnAck, Connect, ConnectReturnCode, MqttError, Publish};
pub use sntp::{SntpError, SntpTime, NTP_PACKET_SIZE, NTP_PORT};
