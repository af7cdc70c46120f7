//! Simple TOML parser for agent configuration
//!
//! Handles only the subset used by `agent.toml`; it does NOT support the
//! full TOML grammar and never allocates.
//!
//! Supported features:
//! - Key = value pairs (string, integer, boolean)
//! - [section] headers
//! - Comments (# ...), including trailing comments
//!
//! NOT supported:
//! - Multi-line strings or escapes
//! - Arrays and inline tables
//! - Dotted keys

use core::fmt;
use core::str::FromStr;

use heapless::String as HString;

use super::types::AgentConfig;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Value does not parse as the expected type
    InvalidValue,
    /// Key not valid in the current section
    UnknownKey,
    /// String value exceeds its fixed capacity
    ValueTooLong,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidSection => write!(f, "invalid section"),
            ParseError::InvalidValue => write!(f, "invalid value"),
            ParseError::UnknownKey => write!(f, "unknown key"),
            ParseError::ValueTooLong => write!(f, "value too long"),
        }
    }
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Wifi,
    Broker,
    Clock,
    Schedule,
    Display,
    Telemetry,
}

/// Parse TOML configuration into [`AgentConfig`]
///
/// Keys that are absent keep their defaults. The result is not validated;
/// call [`AgentConfig::validate`] before use.
pub fn parse_config(input: &str) -> Result<AgentConfig, ParseError> {
    let mut config = AgentConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            let header = strip_comment(line);
            if !header.ends_with(']') {
                return Err(ParseError::InvalidSection);
            }
            section = parse_section_header(&header[1..header.len() - 1])?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidValue)?;
        apply_value(section, key, value, &mut config)?;
    }

    Ok(config)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "wifi" => Ok(Section::Wifi),
        "broker" | "mqtt" => Ok(Section::Broker),
        "clock" | "ntp" => Ok(Section::Clock),
        "schedule" => Ok(Section::Schedule),
        "display" => Ok(Section::Display),
        "telemetry" => Ok(Section::Telemetry),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Drop a trailing comment that is not inside a string
fn strip_comment(s: &str) -> &str {
    let mut in_string = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return s[..i].trim_end(),
            _ => {}
        }
    }
    s
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = strip_comment(line[eq_pos + 1..].trim());

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a quoted string value
fn parse_string<const N: usize>(value: &str) -> Result<HString<N>, ParseError> {
    let inner = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or(ParseError::InvalidValue)?;
    HString::try_from(inner).map_err(|_| ParseError::ValueTooLong)
}

/// Parse an integer value, allowing `_` separators
fn parse_int<T: FromStr>(value: &str) -> Result<T, ParseError> {
    let mut digits: HString<24> = HString::new();
    for c in value.chars().filter(|c| *c != '_') {
        digits.push(c).map_err(|_| ParseError::InvalidValue)?;
    }
    digits.parse().map_err(|_| ParseError::InvalidValue)
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Apply a parsed value to the appropriate config field
fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut AgentConfig,
) -> Result<(), ParseError> {
    match section {
        Section::Wifi => match key {
            "ssid" => config.wifi.ssid = parse_string(value)?,
            "password" => config.wifi.password = parse_string(value)?,
            _ => return Err(ParseError::UnknownKey),
        },
        Section::Broker => {
            let b = &mut config.broker;
            match key {
                "host" => b.host = parse_string(value)?,
                "port" => b.port = parse_int(value)?,
                "client_id" => b.client_id = parse_string(value)?,
                "username" => b.username = parse_string(value)?,
                "password" => b.password = parse_string(value)?,
                "channel_id" => b.channel_id = parse_string(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
        }
        Section::Clock => {
            let c = &mut config.clock;
            match key {
                "ntp_server" | "server" => c.ntp_server = parse_string(value)?,
                "tz_offset_hours" | "tz_offset" => c.tz_offset_hours = parse_int(value)?,
                "resync_interval_s" => c.resync_interval_s = parse_int(value)?,
                "sync_attempts" => c.sync_attempts = parse_int(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
        }
        Section::Schedule => {
            let s = &mut config.schedule;
            match key {
                "reading_interval_ms" => s.reading_interval_ms = parse_int(value)?,
                "publish_interval_s" => s.publish_interval_s = parse_int(value)?,
                "max_retries" => s.max_retries = parse_int(value)?,
                "retry_delay_s" => s.retry_delay_s = parse_int(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
        }
        Section::Display => match key {
            "max" => config.display.max = parse_int(value)?,
            "low_threshold" => config.display.low_threshold = parse_int(value)?,
            _ => return Err(ParseError::UnknownKey),
        },
        Section::Telemetry => match key {
            "include_timestamp" => config.telemetry.include_timestamp = parse_bool(value)?,
            _ => return Err(ParseError::UnknownKey),
        },
        Section::Root => return Err(ParseError::UnknownKey),
    }

    Ok(())
}
