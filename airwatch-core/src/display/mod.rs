//! Display presentation
//!
//! Turns the tick's reading and visibility decision into text on a
//! [`DisplayBackend`](crate::traits::DisplayBackend).

pub mod frame;
pub mod presenter;

pub use frame::Frame;
pub use presenter::DisplayPresenter;
