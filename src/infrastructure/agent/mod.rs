//! Host-resident status agent adapter
//!
//! HTTP client for the small status endpoint that runs next to the
//! hypervisor, independent of the management agent process.

pub mod http_probe;

pub use http_probe::{AgentStatusBody, HttpAgentStatusProbe};
