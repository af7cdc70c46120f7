//! Display presenter

use super::frame::Frame;
use crate::sensor::Reading;
use crate::traits::{DisplayBackend, DisplayError, TextRole};

/// Renders readings or blank frames through a display backend
pub struct DisplayPresenter<B> {
    backend: B,
    frame: Frame,
}

impl<B: DisplayBackend> DisplayPresenter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            frame: Frame::new(),
        }
    }

    /// Render one tick
    ///
    /// Draws the reading when `visible` and a reading is present, otherwise
    /// a blank frame. Every call clears the backend first, so nothing from
    /// the previous frame survives.
    pub fn render(
        &mut self,
        reading: Option<&Reading>,
        visible: bool,
        clock_synced: bool,
    ) -> Result<(), DisplayError> {
        match reading {
            Some(reading) if visible => {
                let clock = clock_synced.then_some(&reading.captured_at);
                self.frame.compose(reading, clock);
            }
            _ => self.frame.clear(),
        }

        self.backend.clear()?;
        if !self.frame.headline().is_empty() {
            self.backend
                .draw_text(self.frame.headline(), TextRole::Headline)?;
        }
        if !self.frame.caption().is_empty() {
            self.backend.draw_text(self.frame.caption(), TextRole::Caption)?;
        }
        self.backend.flush()
    }

    /// Frame drawn by the last render
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use heapless::{String, Vec};

    use crate::traits::{DisplayBackend, DisplayError, TextRole};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Op {
        Clear,
        Text(String<24>, TextRole),
        Flush,
    }

    /// Backend recording every call
    #[derive(Default)]
    pub struct RecordingBackend {
        pub ops: Vec<Op, 64>,
        pub fail_flush: bool,
    }

    impl RecordingBackend {
        /// Text drawn since the last clear
        pub fn visible_text(&self) -> Vec<(&str, TextRole), 4> {
            let start = self
                .ops
                .iter()
                .rposition(|op| *op == Op::Clear)
                .map_or(0, |i| i + 1);
            self.ops[start..]
                .iter()
                .filter_map(|op| match op {
                    Op::Text(text, role) => Some((text.as_str(), *role)),
                    _ => None,
                })
                .collect()
        }
    }

    impl DisplayBackend for RecordingBackend {
        fn clear(&mut self) -> Result<(), DisplayError> {
            let _ = self.ops.push(Op::Clear);
            Ok(())
        }

        fn draw_text(&mut self, text: &str, role: TextRole) -> Result<(), DisplayError> {
            let text = String::try_from(text).map_err(|_| DisplayError::BufferOverflow)?;
            let _ = self.ops.push(Op::Text(text, role));
            Ok(())
        }

        fn flush(&mut self) -> Result<(), DisplayError> {
            if self.fail_flush {
                return Err(DisplayError::Communication);
            }
            let _ = self.ops.push(Op::Flush);
            Ok(())
        }

        fn dimensions(&self) -> (u16, u16) {
            (128, 64)
        }
    }
}
