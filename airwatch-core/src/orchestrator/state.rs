//! Per-tick state record

use crate::clock::MonotonicInstant;
use crate::config::{AgentConfig, ConfigError};
use crate::publish::PublishSchedule;
use crate::sensor::Reading;
use crate::visibility::VisibilityWindow;

/// Everything the loop carries from one tick to the next
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoopState {
    /// Ticks completed
    pub tick: u32,
    pub visibility: VisibilityWindow,
    pub schedule: PublishSchedule,
    /// Last good reading, kept for display continuity
    pub last_reading: Option<Reading>,
}

impl LoopState {
    pub fn new(visibility: VisibilityWindow, schedule: PublishSchedule) -> Self {
        Self {
            tick: 0,
            visibility,
            schedule,
            last_reading: None,
        }
    }

    /// Initial state for a loop starting at `start`
    pub fn from_config(config: &AgentConfig, start: MonotonicInstant) -> Result<Self, ConfigError> {
        let visibility = VisibilityWindow::from_config(&config.display)?;
        let schedule = PublishSchedule::new(config.schedule.publish_interval(), start);
        Ok(Self::new(visibility, schedule))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    #[test]
    fn test_from_config() {
        let config = AgentConfig::default();
        let state = LoopState::from_config(&config, MonotonicInstant::from_secs(10)).unwrap();

        assert_eq!(state.tick, 0);
        assert_eq!(state.visibility.counter(), 4);
        assert_eq!(state.schedule.next_due(), MonotonicInstant::from_secs(1810));
        assert_eq!(state.schedule.interval(), Duration::from_secs(1800));
        assert!(state.last_reading.is_none());
    }

    #[test]
    fn test_from_config_rejects_bad_window() {
        let mut config = AgentConfig::default();
        config.display.low_threshold = config.display.max;
        assert_eq!(
            LoopState::from_config(&config, MonotonicInstant::ZERO),
            Err(ConfigError::InvalidVisibilityWindow)
        );
    }
}
