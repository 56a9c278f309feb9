//! Run-state port - which workloads the management plane believes are on a host.

use async_trait::async_trait;

use crate::domain::errors::PortResult;
use crate::domain::models::{HostId, Workload, WorkloadState};

#[async_trait]
pub trait RunStateStore: Send + Sync {
    /// Workloads assigned to `host_id` whose state is one of `states`.
    async fn workloads_on_host(
        &self,
        host_id: &HostId,
        states: &[WorkloadState],
    ) -> PortResult<Vec<Workload>>;
}
