//! Loop orchestrator
//!
//! One fixed-period tick over an explicit [`LoopState`] record. The caller
//! owns the ticker and the state between ticks.

pub mod state;
pub mod tick;

pub use state::LoopState;
pub use tick::{Orchestrator, SampleStatus, TickReport};
