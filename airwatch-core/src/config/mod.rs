//! Agent configuration
//!
//! Types, validation and the TOML-subset parser for `agent.toml`.

pub mod toml;
pub mod types;

pub use self::toml::{parse_config, ParseError};
pub use types::*;
