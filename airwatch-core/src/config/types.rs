//! Configuration type definitions
//!
//! Configuration is read once at startup and never re-read during the loop.

use core::fmt;
use core::time::Duration;

use heapless::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum length of host names
pub const MAX_HOST_LEN: usize = 64;

/// Maximum length of credentials and identifiers
pub const MAX_CREDENTIAL_LEN: usize = 64;

/// Maximum length of the wifi SSID
pub const MAX_SSID_LEN: usize = 32;

/// Configuration error, fatal at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Visibility window bounds violate `max > low_threshold`
    InvalidVisibilityWindow,
    /// A required credential or identifier is empty
    MissingCredential,
    /// An interval is zero or out of range
    InvalidInterval,
    /// Timezone offset outside -12..=14 hours
    InvalidTimezone,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidVisibilityWindow => {
                write!(f, "visibility window needs max > low_threshold")
            }
            ConfigError::MissingCredential => write!(f, "missing broker or wifi credential"),
            ConfigError::InvalidInterval => write!(f, "interval out of range"),
            ConfigError::InvalidTimezone => write!(f, "timezone offset out of range"),
        }
    }
}

/// Wireless network credentials
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WifiConfig {
    pub ssid: String<MAX_SSID_LEN>,
    pub password: String<MAX_CREDENTIAL_LEN>,
}

/// Telemetry broker
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BrokerConfig {
    pub host: String<MAX_HOST_LEN>,
    pub port: u16,
    pub client_id: String<MAX_CREDENTIAL_LEN>,
    /// Falls back to `client_id` when empty
    pub username: String<MAX_CREDENTIAL_LEN>,
    pub password: String<MAX_CREDENTIAL_LEN>,
    pub channel_id: String<MAX_CREDENTIAL_LEN>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            client_id: String::new(),
            username: String::new(),
            password: String::new(),
            channel_id: String::new(),
        }
    }
}

impl BrokerConfig {
    /// Username sent on connect
    pub fn effective_username(&self) -> &str {
        if self.username.is_empty() {
            self.client_id.as_str()
        } else {
            self.username.as_str()
        }
    }
}

/// Calendar clock synchronization
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClockConfig {
    pub ntp_server: String<MAX_HOST_LEN>,
    /// Local offset from UTC in whole hours
    pub tz_offset_hours: i8,
    /// Periodic re-sync interval, 0 disables
    pub resync_interval_s: u32,
    /// Startup sync attempts before running uncalibrated
    pub sync_attempts: u8,
}

impl Default for ClockConfig {
    fn default() -> Self {
        let mut ntp_server = String::new();
        // "0.pool.ntp.org" fits MAX_HOST_LEN
        let _ = ntp_server.push_str("0.pool.ntp.org");
        Self {
            ntp_server,
            tz_offset_hours: -7,
            resync_interval_s: 0,
            sync_attempts: 3,
        }
    }
}

impl ClockConfig {
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.resync_interval_s))
    }
}

/// Loop cadences and publish retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScheduleConfig {
    pub reading_interval_ms: u32,
    pub publish_interval_s: u32,
    /// Retries after a failed publish before waiting a full interval
    pub max_retries: u8,
    pub retry_delay_s: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            reading_interval_ms: 1000,
            publish_interval_s: 1800,
            max_retries: 3,
            retry_delay_s: 5,
        }
    }
}

impl ScheduleConfig {
    pub fn reading_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.reading_interval_ms))
    }

    pub fn publish_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.publish_interval_s))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(u64::from(self.retry_delay_s))
    }
}

/// Display visibility duty cycle bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplayConfig {
    pub max: u16,
    pub low_threshold: u16,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max: 4,
            low_threshold: 1,
        }
    }
}

/// Payload options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TelemetryConfig {
    /// Append the calendar time to the status field once synced
    pub include_timestamp: bool,
}

/// Complete agent configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AgentConfig {
    pub wifi: WifiConfig,
    pub broker: BrokerConfig,
    pub clock: ClockConfig,
    pub schedule: ScheduleConfig,
    pub display: DisplayConfig,
    pub telemetry: TelemetryConfig,
}

impl AgentConfig {
    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display.max == 0 || self.display.low_threshold >= self.display.max {
            return Err(ConfigError::InvalidVisibilityWindow);
        }

        if self.wifi.ssid.is_empty()
            || self.broker.host.is_empty()
            || self.broker.client_id.is_empty()
            || self.broker.password.is_empty()
            || self.broker.channel_id.is_empty()
        {
            return Err(ConfigError::MissingCredential);
        }

        let s = &self.schedule;
        if s.reading_interval_ms == 0
            || s.publish_interval_s == 0
            || u64::from(s.publish_interval_s) * 1000 < u64::from(s.reading_interval_ms)
        {
            return Err(ConfigError::InvalidInterval);
        }
        if s.max_retries > 0 && (s.retry_delay_s == 0 || s.retry_delay_s >= s.publish_interval_s)
        {
            return Err(ConfigError::InvalidInterval);
        }

        if !(-12..=14).contains(&self.clock.tz_offset_hours) {
            return Err(ConfigError::InvalidTimezone);
        }

        Ok(())
    }
}
