//! Telemetry payload formatting
//!
//! One line of `&`-joined key=value fields:
//!
//! ```text
//! field1=68.0&field2=45.0&field3=12345&field4=120&status=Good (120)
//! ```

use core::fmt::{self, Write};

use heapless::String;

use crate::clock::CalendarTime;
use crate::sensor::Reading;
use crate::traits::PublishError;

/// Payload capacity
pub const PAYLOAD_LEN: usize = 192;

/// Topic capacity
pub const TOPIC_LEN: usize = 96;

pub type Payload = String<PAYLOAD_LEN>;
pub type Topic = String<TOPIC_LEN>;

/// Air-quality label derived from the VOC index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AirQuality {
    Excellent,
    Good,
    Meh,
    Yuck,
}

impl AirQuality {
    /// Classify a VOC index
    ///
    /// Bounds are exclusive: below 80 is excellent, below 150 good, below
    /// 250 meh, anything higher yuck.
    pub fn from_voc_index(index: u16) -> Self {
        match index {
            0..=79 => AirQuality::Excellent,
            80..=149 => AirQuality::Good,
            150..=249 => AirQuality::Meh,
            _ => AirQuality::Yuck,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            AirQuality::Excellent => "Excellent",
            AirQuality::Good => "Good",
            AirQuality::Meh => "Meh",
            AirQuality::Yuck => "Yuck",
        }
    }
}

impl fmt::Display for AirQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the payload for a reading
///
/// With `timestamp` set, the status field gets an ` @ <calendar time>`
/// suffix.
pub fn compose_payload(
    reading: &Reading,
    timestamp: Option<&CalendarTime>,
) -> Result<Payload, PublishError> {
    let mut payload = Payload::new();
    write_payload(&mut payload, reading, timestamp)?;
    Ok(payload)
}

fn write_payload(
    out: &mut Payload,
    reading: &Reading,
    timestamp: Option<&CalendarTime>,
) -> fmt::Result {
    write!(
        out,
        "field1={:.1}&field2={:.1}&field3={}&field4={}&status={} ({})",
        reading.temperature_f(),
        reading.humidity_pct,
        reading.raw_gas,
        reading.voc_index,
        AirQuality::from_voc_index(reading.voc_index),
        reading.voc_index,
    )?;
    if let Some(time) = timestamp {
        write!(out, " @ {}", time)?;
    }
    Ok(())
}

/// Publish topic for a channel
pub fn topic(channel_id: &str) -> Result<Topic, PublishError> {
    let mut topic = Topic::new();
    write!(topic, "channels/{}/publish", channel_id)?;
    Ok(topic)
}
