//! Host-resident status agent port.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::errors::AgentError;
use crate::domain::models::Host;

/// Asks the hypervisor on `host` how many workloads it is running, bypassing
/// the management agent.
#[async_trait]
pub trait AgentStatusProbe: Send + Sync {
    /// `timeout` bounds each individual request attempt.
    async fn running_count(&self, host: &Host, timeout: Duration) -> Result<u32, AgentError>;
}
