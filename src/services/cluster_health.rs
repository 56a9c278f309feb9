//! Cluster-wide health gate.

use std::sync::Arc;
use tracing::debug;

use crate::domain::errors::PortResult;
use crate::domain::models::{ClusterHealthSnapshot, ClusterId};
use crate::domain::ports::ClusterMembership;

/// Recomputes the status-bucket snapshot of a cluster on every call.
pub struct ClusterHealthService {
    membership: Arc<dyn ClusterMembership>,
}

impl ClusterHealthService {
    pub fn new(membership: Arc<dyn ClusterMembership>) -> Self {
        Self { membership }
    }

    pub async fn snapshot(&self, cluster_id: &ClusterId) -> PortResult<ClusterHealthSnapshot> {
        let hosts = self.membership.list_hosts(cluster_id).await?;
        let snapshot = ClusterHealthSnapshot::from_hosts(&hosts);
        debug!(
            cluster_id = %cluster_id,
            total = snapshot.total,
            problematic = snapshot.problematic,
            "cluster health snapshot"
        );
        Ok(snapshot)
    }
}
