//! Display backend trait

use core::fmt;

/// Display backend errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Communication error with display
    Communication,
    /// Display not initialized
    NotInitialized,
    /// Text did not fit the frame buffer
    BufferOverflow,
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::Communication => f.write_str("display communication error"),
            DisplayError::NotInitialized => f.write_str("display not initialized"),
            DisplayError::BufferOverflow => f.write_str("display buffer overflow"),
        }
    }
}

/// Placement of a text element in the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TextRole {
    /// Large text centered on the frame
    Headline,
    /// Small text centered along the bottom edge
    Caption,
}

/// Display backend trait
///
/// Provides a hardware-agnostic interface for rendering to a small
/// monochrome display. Drawing calls only touch the backend's buffer;
/// nothing is visible until [`DisplayBackend::flush`].
pub trait DisplayBackend {
    /// Clear the whole buffer
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Draw centered text in the given role
    fn draw_text(&mut self, text: &str, role: TextRole) -> Result<(), DisplayError>;

    /// Send the buffer to the panel
    fn flush(&mut self) -> Result<(), DisplayError>;

    /// Panel size in pixels (width, height)
    fn dimensions(&self) -> (u16, u16);
}
