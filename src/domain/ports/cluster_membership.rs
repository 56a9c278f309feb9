//! Cluster membership port - read host records and request status transitions.

use async_trait::async_trait;

use crate::domain::errors::PortResult;
use crate::domain::models::{ClusterId, Host, HostId, HostStatus};

/// Source of truth for hosts and their observed status.
#[async_trait]
pub trait ClusterMembership: Send + Sync {
    /// Fetch a single host record.
    async fn get_host(&self, host_id: &HostId) -> PortResult<Host>;

    /// List every host in a cluster, whatever its status.
    async fn list_hosts(&self, cluster_id: &ClusterId) -> PortResult<Vec<Host>>;

    /// Request a status transition for a host.
    async fn update_status(&self, host_id: &HostId, status: HostStatus) -> PortResult<()>;

    /// Up hosts in the same cluster as `host`, excluding `host` itself.
    async fn up_peers(&self, host: &Host) -> PortResult<Vec<Host>> {
        let hosts = self.list_hosts(&host.cluster_id).await?;
        Ok(hosts
            .into_iter()
            .filter(|h| h.is_up() && h.is_peer_of(host))
            .collect())
    }
}
