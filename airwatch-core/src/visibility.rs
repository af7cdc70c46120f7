//! Visibility window
//!
//! A cyclic counter that blanks the display for part of every cycle to
//! bound average pixel-on-time. The counter starts at `max`, the tick is
//! visible while `counter > low_threshold`, and the counter decrements
//! after each decision. The zero tick is evaluated (blank) before the
//! counter wraps back to `max`, so one cycle is `max + 1` ticks with
//! `max - low_threshold` of them visible.

use crate::config::{ConfigError, DisplayConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Display duty-cycle counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VisibilityWindow {
    counter: u16,
    max: u16,
    low_threshold: u16,
}

impl VisibilityWindow {
    /// Create a window starting at the top of its cycle
    ///
    /// Rejects `max == 0` and `low_threshold >= max`.
    pub fn new(max: u16, low_threshold: u16) -> Result<Self, ConfigError> {
        if max == 0 || low_threshold >= max {
            return Err(ConfigError::InvalidVisibilityWindow);
        }
        Ok(Self {
            counter: max,
            max,
            low_threshold,
        })
    }

    pub fn from_config(config: &DisplayConfig) -> Result<Self, ConfigError> {
        Self::new(config.max, config.low_threshold)
    }

    /// Visibility for the current tick
    pub fn tick(&self) -> bool {
        self.counter > self.low_threshold
    }

    /// Move to the next tick
    pub fn advance(&mut self) {
        self.counter = match self.counter {
            0 => self.max,
            n => n - 1,
        };
    }

    pub fn counter(&self) -> u16 {
        self.counter
    }

    /// Ticks per cycle
    pub fn period(&self) -> u32 {
        u32::from(self.max) + 1
    }

    /// Visible ticks per cycle
    pub fn visible_ticks(&self) -> u16 {
        self.max - self.low_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn run(window: &mut VisibilityWindow, ticks: usize) -> heapless::Vec<bool, 64> {
        let mut seen = heapless::Vec::new();
        for _ in 0..ticks {
            seen.push(window.tick()).unwrap();
            window.advance();
        }
        seen
    }

    #[test]
    fn test_four_one_sequence() {
        let mut window = VisibilityWindow::new(4, 1).unwrap();
        let first = run(&mut window, 5);
        assert_eq!(first.as_slice(), &[true, true, true, false, false]);

        let second = run(&mut window, 5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_threshold_blanks_only_zero_tick() {
        let mut window = VisibilityWindow::new(3, 0).unwrap();
        let seen = run(&mut window, 8);
        assert_eq!(
            seen.as_slice(),
            &[true, true, true, false, true, true, true, false]
        );
    }

    #[test]
    fn test_wrap_happens_after_zero_tick() {
        let mut window = VisibilityWindow::new(2, 1).unwrap();
        window.advance();
        window.advance();
        assert_eq!(window.counter(), 0);
        assert!(!window.tick());
        window.advance();
        assert_eq!(window.counter(), 2);
    }

    #[test]
    fn test_invalid_bounds() {
        assert_eq!(
            VisibilityWindow::new(4, 4),
            Err(ConfigError::InvalidVisibilityWindow)
        );
        assert_eq!(
            VisibilityWindow::new(4, 9),
            Err(ConfigError::InvalidVisibilityWindow)
        );
        assert_eq!(
            VisibilityWindow::new(0, 0),
            Err(ConfigError::InvalidVisibilityWindow)
        );
    }

    proptest! {
        #[test]
        fn prop_visible_ticks_per_period(max in 1u16..500, low in 0u16..500) {
            prop_assume!(low < max);
            let mut window = VisibilityWindow::new(max, low).unwrap();

            for _ in 0..3 {
                let mut visible = 0u32;
                for _ in 0..window.period() {
                    if window.tick() {
                        visible += 1;
                    }
                    window.advance();
                }
                prop_assert_eq!(visible, u32::from(max - low));
                prop_assert_eq!(window.counter(), max);
            }
        }

        #[test]
        fn prop_counter_stays_in_bounds(max in 1u16..100, low in 0u16..100, steps in 0usize..1000) {
            prop_assume!(low < max);
            let mut window = VisibilityWindow::new(max, low).unwrap();
            for _ in 0..steps {
                window.advance();
                prop_assert!(window.counter() <= max);
            }
        }
    }
}
