//! Domain layer for the hostwarden HA subsystem
//!
//! This module contains the core models, port traits and error types.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{ActivityError, AgentError, OobmError, PeerError, PortError, PortResult};
