use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::fixture::{ClusterFixture, PeerBehaviour};
use crate::domain::errors::{AgentError, OobmError, PeerError, PortError, PortResult};
use crate::domain::models::{
    ClusterId, Host, HostId, HostStatus, PoolId, StoragePool, Volume, VolumeId, Workload,
    WorkloadId, WorkloadState,
};
use crate::domain::ports::{
    AgentStatusProbe, ClusterMembership, OutOfBandManagement, PeerAnswer, PeerChannel,
    PeerCommand, PowerState, RunStateStore, VolumeDirectory,
};

/// Power operation recorded by [`InMemoryCluster`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OobmCall {
    Reset(HostId),
    PowerOff(HostId),
}

/// Serves every HA port from a [`ClusterFixture`].
///
/// Power operations are recorded so callers can assert how often the
/// actuator was invoked.
#[derive(Debug, Default)]
pub struct InMemoryCluster {
    fixture: RwLock<ClusterFixture>,
    oobm_calls: Mutex<Vec<OobmCall>>,
}

impl InMemoryCluster {
    pub fn new(fixture: ClusterFixture) -> Self {
        Self {
            fixture: RwLock::new(fixture),
            oobm_calls: Mutex::new(Vec::new()),
        }
    }

    /// Apply a change to the underlying fixture.
    pub async fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut ClusterFixture),
    {
        let mut fixture = self.fixture.write().await;
        change(&mut fixture);
    }

    pub async fn snapshot(&self) -> ClusterFixture {
        self.fixture.read().await.clone()
    }

    pub async fn oobm_calls(&self) -> Vec<OobmCall> {
        self.oobm_calls.lock().await.clone()
    }

    async fn peer_behaviour(&self, peer: &HostId) -> PeerBehaviour {
        self.fixture
            .read()
            .await
            .peers
            .get(peer)
            .cloned()
            .unwrap_or_default()
    }

    async fn answer_activity(
        &self,
        peer: &Host,
        behaviour: &PeerBehaviour,
        pool: &PoolId,
        volumes: &[VolumeId],
        since: chrono::DateTime<chrono::Utc>,
    ) -> Result<PeerAnswer, PeerError> {
        if behaviour.unavailable_pools.contains(pool) {
            return Err(PeerError::StorageUnavailable {
                peer: peer.id.clone(),
                pool: pool.clone(),
            });
        }

        let fixture = self.fixture.read().await;
        let active = volumes
            .iter()
            .filter_map(|v| fixture.last_writes.get(v))
            .any(|written| *written > since);
        Ok(PeerAnswer::Activity(active))
    }
}

#[async_trait]
impl ClusterMembership for InMemoryCluster {
    async fn get_host(&self, host_id: &HostId) -> PortResult<Host> {
        self.fixture
            .read()
            .await
            .host(host_id)
            .cloned()
            .ok_or_else(|| PortError::HostNotFound(host_id.clone()))
    }

    async fn list_hosts(&self, cluster_id: &ClusterId) -> PortResult<Vec<Host>> {
        Ok(self
            .fixture
            .read()
            .await
            .hosts
            .iter()
            .filter(|h| &h.cluster_id == cluster_id)
            .cloned()
            .collect())
    }

    async fn update_status(&self, host_id: &HostId, status: HostStatus) -> PortResult<()> {
        let mut fixture = self.fixture.write().await;
        let host = fixture
            .hosts
            .iter_mut()
            .find(|h| &h.id == host_id)
            .ok_or_else(|| PortError::HostNotFound(host_id.clone()))?;
        host.status = status;
        Ok(())
    }
}

#[async_trait]
impl RunStateStore for InMemoryCluster {
    async fn workloads_on_host(
        &self,
        host_id: &HostId,
        states: &[WorkloadState],
    ) -> PortResult<Vec<Workload>> {
        Ok(self
            .fixture
            .read()
            .await
            .workloads
            .get(host_id)
            .map(|ws| {
                ws.iter()
                    .filter(|w| states.contains(&w.state))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl VolumeDirectory for InMemoryCluster {
    async fn volumes_for(&self, workload_id: &WorkloadId) -> PortResult<Vec<Volume>> {
        Ok(self
            .fixture
            .read()
            .await
            .volumes
            .get(workload_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn pool(&self, pool_id: &PoolId) -> PortResult<StoragePool> {
        self.fixture
            .read()
            .await
            .pools
            .iter()
            .find(|p| &p.id == pool_id)
            .cloned()
            .ok_or_else(|| PortError::PoolNotFound(pool_id.clone()))
    }
}

#[async_trait]
impl OutOfBandManagement for InMemoryCluster {
    async fn reset(&self, host: &Host) -> Result<(), OobmError> {
        self.oobm_calls
            .lock()
            .await
            .push(OobmCall::Reset(host.id.clone()));

        let fixture = self.fixture.read().await;
        match fixture.oobm.get(&host.id) {
            Some(b) if b.fail_reset => Err(OobmError::Operation("reset rejected by BMC".into())),
            _ => Ok(()),
        }
    }

    async fn power_off(&self, host: &Host) -> Result<(), OobmError> {
        self.oobm_calls
            .lock()
            .await
            .push(OobmCall::PowerOff(host.id.clone()));

        let mut fixture = self.fixture.write().await;
        let behaviour = fixture.oobm.entry(host.id.clone()).or_default();
        if behaviour.fail_power_off {
            return Err(OobmError::Operation("power off rejected by BMC".into()));
        }
        behaviour.power_state = PowerState::Off;
        Ok(())
    }

    async fn power_state(&self, host: &Host) -> Result<PowerState, OobmError> {
        Ok(self
            .fixture
            .read()
            .await
            .oobm
            .get(&host.id)
            .map_or(PowerState::On, |b| b.power_state))
    }
}

#[async_trait]
impl PeerChannel for InMemoryCluster {
    async fn send(&self, peer: &Host, command: PeerCommand) -> Result<PeerAnswer, PeerError> {
        let behaviour = self.peer_behaviour(&peer.id).await;
        if behaviour.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(behaviour.latency_ms)).await;
        }
        if !behaviour.responsive {
            return Err(PeerError::Unreachable(peer.id.clone()));
        }

        debug!(peer = %peer.id, command = ?command, "peer command");
        match command {
            PeerCommand::CheckReachability { suspect, .. } => {
                Ok(PeerAnswer::Reachable(behaviour.reaches.contains(&suspect)))
            }
            PeerCommand::CheckActivity {
                pool,
                workloads,
                since,
                ..
            } => {
                let volumes: Vec<VolumeId> =
                    workloads.iter().map(|w| w.volume_id.clone()).collect();
                self.answer_activity(peer, &behaviour, &pool, &volumes, since.started_at())
                    .await
            }
        }
    }
}

#[async_trait]
impl AgentStatusProbe for InMemoryCluster {
    async fn running_count(&self, host: &Host, _timeout: Duration) -> Result<u32, AgentError> {
        self.fixture
            .read()
            .await
            .agent_counts
            .get(&host.id)
            .copied()
            .ok_or_else(|| AgentError::Request(format!("connection refused: {}", host.address)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{PoolKind, SuspectWindow, WorkloadRef};
    use chrono::{Duration as ChronoDuration, Utc};

    fn fixture() -> ClusterFixture {
        ClusterFixture::new()
            .with_host("h1", "c1", HostStatus::Disconnected)
            .with_host("h2", "c1", HostStatus::Up)
            .with_host("h3", "c2", HostStatus::Up)
            .with_pool("nfs-1", PoolKind::NetworkFilesystem)
            .with_workload("h1", "vm-1", WorkloadState::Running, "nfs-1")
            .with_workload("h1", "vm-2", WorkloadState::Starting, "nfs-1")
    }

    #[tokio::test]
    async fn test_membership_filters_by_cluster() {
        let cluster = InMemoryCluster::new(fixture());
        let hosts = cluster.list_hosts(&ClusterId::new("c1")).await.unwrap();
        assert_eq!(hosts.len(), 2);

        let h1 = cluster.get_host(&HostId::new("h1")).await.unwrap();
        let peers = cluster.up_peers(&h1).await.unwrap();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].id, HostId::new("h2"));
    }

    #[tokio::test]
    async fn test_run_state_filters_by_state() {
        let cluster = InMemoryCluster::new(fixture());
        let running = cluster
            .workloads_on_host(&HostId::new("h1"), &WorkloadState::EXPECTED_RUNNING)
            .await
            .unwrap();
        assert_eq!(running.len(), 1);
    }

    #[tokio::test]
    async fn test_activity_answer_uses_last_writes() {
        let now = Utc::now();
        let cluster = InMemoryCluster::new(
            fixture().with_last_write("vm-1-root", now + ChronoDuration::seconds(5)),
        );
        let h2 = cluster.get_host(&HostId::new("h2")).await.unwrap();
        let command = PeerCommand::CheckActivity {
            suspect: HostId::new("h1"),
            pool: PoolId::new("nfs-1"),
            workloads: vec![WorkloadRef {
                workload_id: WorkloadId::new("vm-1"),
                pool_id: PoolId::new("nfs-1"),
                volume_id: VolumeId::new("vm-1-root"),
            }],
            since: SuspectWindow::starting_at(now),
        };

        let answer = cluster.send(&h2, command).await.unwrap();
        assert_eq!(answer, PeerAnswer::Activity(true));
    }

    #[tokio::test]
    async fn test_power_off_is_recorded() {
        let cluster = InMemoryCluster::new(fixture());
        let h1 = cluster.get_host(&HostId::new("h1")).await.unwrap();

        cluster.power_off(&h1).await.unwrap();

        assert_eq!(cluster.power_state(&h1).await.unwrap(), PowerState::Off);
        assert_eq!(cluster.oobm_calls().await, vec![OobmCall::PowerOff(HostId::new("h1"))]);
    }

    #[tokio::test]
    async fn test_missing_agent_count_is_unreachable() {
        let cluster = InMemoryCluster::new(fixture());
        let h1 = cluster.get_host(&HostId::new("h1")).await.unwrap();

        let result = cluster.running_count(&h1, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(AgentError::Request(_))));
    }
}
