//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod agent;
pub mod network;

pub use agent::{agent_task, AgentOrchestrator, SharedI2c};
pub use network::{cyw43_task, net_task, network_task, WifiSpi};
