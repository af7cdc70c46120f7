//! Reusable frame buffer
//!
//! The presenter owns exactly one [`Frame`] and rewrites it in place every
//! tick.

use core::fmt::Write;

use heapless::String;

use crate::clock::CalendarTime;
use crate::sensor::Reading;

/// Maximum headline length
pub const HEADLINE_LEN: usize = 12;

/// Maximum caption length
pub const CAPTION_LEN: usize = 21;

/// Text content of one display frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    headline: String<HEADLINE_LEN>,
    caption: String<CAPTION_LEN>,
}

impl Frame {
    pub const fn new() -> Self {
        Self {
            headline: String::new(),
            caption: String::new(),
        }
    }

    /// Erase all content
    pub fn clear(&mut self) {
        self.headline.clear();
        self.caption.clear();
    }

    /// Replace the content with a reading
    ///
    /// The headline is the VOC index. The caption carries the short clock
    /// text when calendar time is trustworthy.
    pub fn compose(&mut self, reading: &Reading, clock: Option<&CalendarTime>) {
        self.clear();
        // u16 always fits HEADLINE_LEN
        let _ = write!(self.headline, "{}", reading.voc_index);
        if let Some(time) = clock {
            let _ = write!(self.caption, "{}", time.short());
        }
    }

    pub fn headline(&self) -> &str {
        self.headline.as_str()
    }

    pub fn caption(&self) -> &str {
        self.caption.as_str()
    }

    /// Frame has no content
    pub fn is_blank(&self) -> bool {
        self.headline.is_empty() && self.caption.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(voc_index: u16) -> Reading {
        Reading {
            temperature_c: 20.0,
            humidity_pct: 45.0,
            raw_gas: 12345,
            voc_index,
            captured_at: CalendarTime::EPOCH,
        }
    }

    #[test]
    fn test_compose_replaces_previous_content() {
        let mut frame = Frame::new();
        let time = CalendarTime::from_unix(1_700_000_000, -7);

        frame.compose(&reading(12345), Some(&time));
        assert_eq!(frame.headline(), "12345");
        assert_eq!(frame.caption(), "Tue 15:13");

        frame.compose(&reading(7), None);
        assert_eq!(frame.headline(), "7");
        assert_eq!(frame.caption(), "");
    }

    #[test]
    fn test_clear() {
        let mut frame = Frame::new();
        frame.compose(&reading(120), None);
        assert!(!frame.is_blank());
        frame.clear();
        assert!(frame.is_blank());
    }
}
