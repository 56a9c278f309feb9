use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::models::{
    ClusterId, Host, HostId, HostStatus, HypervisorKind, PoolId, PoolKind, StoragePool, Volume,
    VolumeId, Workload, WorkloadId, WorkloadState,
};
use crate::domain::ports::PowerState;

/// How a host behaves when a peer command is sent to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PeerBehaviour {
    /// Whether the host answers peer commands at all
    #[serde(default = "default_true")]
    pub responsive: bool,

    /// Hosts this peer can reach directly
    #[serde(default)]
    pub reaches: Vec<HostId>,

    /// Pools this peer cannot access
    #[serde(default)]
    pub unavailable_pools: Vec<PoolId>,

    /// Artificial answer latency in milliseconds
    #[serde(default)]
    pub latency_ms: u64,
}

fn default_true() -> bool {
    true
}

impl Default for PeerBehaviour {
    fn default() -> Self {
        Self {
            responsive: true,
            reaches: Vec::new(),
            unavailable_pools: Vec::new(),
            latency_ms: 0,
        }
    }
}

/// Out-of-band management behaviour of one host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OobmBehaviour {
    #[serde(default)]
    pub fail_reset: bool,

    #[serde(default)]
    pub fail_power_off: bool,

    #[serde(default = "default_power_state")]
    pub power_state: PowerState,
}

fn default_power_state() -> PowerState {
    PowerState::On
}

impl Default for OobmBehaviour {
    fn default() -> Self {
        Self {
            fail_reset: false,
            fail_power_off: false,
            power_state: default_power_state(),
        }
    }
}

/// Complete description of a simulated cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClusterFixture {
    #[serde(default)]
    pub hosts: Vec<Host>,

    /// Workloads per host as recorded in run-state
    #[serde(default)]
    pub workloads: BTreeMap<HostId, Vec<Workload>>,

    /// Volumes per workload
    #[serde(default)]
    pub volumes: BTreeMap<WorkloadId, Vec<Volume>>,

    #[serde(default)]
    pub pools: Vec<StoragePool>,

    /// Running count each host's status agent reports; absent means unreachable
    #[serde(default)]
    pub agent_counts: BTreeMap<HostId, u32>,

    /// Last observed write per volume
    #[serde(default)]
    pub last_writes: BTreeMap<VolumeId, DateTime<Utc>>,

    #[serde(default)]
    pub peers: BTreeMap<HostId, PeerBehaviour>,

    #[serde(default)]
    pub oobm: BTreeMap<HostId, OobmBehaviour>,
}

impl ClusterFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse fixture {}", path.display()))
    }

    /// Add a KVM host with out-of-band management enabled.
    pub fn with_host(mut self, id: &str, cluster: &str, status: HostStatus) -> Self {
        self.hosts.push(Host {
            id: HostId::new(id),
            cluster_id: ClusterId::new(cluster),
            hypervisor: HypervisorKind::Kvm,
            address: format!("{id}.mgmt.local"),
            status,
            oobm_enabled: true,
        });
        self
    }

    pub fn with_pool(mut self, id: &str, kind: PoolKind) -> Self {
        self.pools.push(StoragePool {
            id: PoolId::new(id),
            kind,
        });
        self
    }

    /// Place a workload on `host` with one volume on `pool`.
    pub fn with_workload(
        mut self,
        host: &str,
        workload: &str,
        state: WorkloadState,
        pool: &str,
    ) -> Self {
        let workload_id = WorkloadId::new(workload);
        self.workloads
            .entry(HostId::new(host))
            .or_default()
            .push(Workload {
                id: workload_id.clone(),
                state,
            });
        self.volumes.entry(workload_id).or_default().push(Volume {
            id: VolumeId::new(format!("{workload}-root")),
            pool_id: PoolId::new(pool),
        });
        self
    }

    pub fn with_agent_count(mut self, host: &str, count: u32) -> Self {
        self.agent_counts.insert(HostId::new(host), count);
        self
    }

    pub fn with_last_write(mut self, volume: &str, at: DateTime<Utc>) -> Self {
        self.last_writes.insert(VolumeId::new(volume), at);
        self
    }

    pub fn with_peer(mut self, host: &str, behaviour: PeerBehaviour) -> Self {
        self.peers.insert(HostId::new(host), behaviour);
        self
    }

    pub fn with_oobm(mut self, host: &str, behaviour: OobmBehaviour) -> Self {
        self.oobm.insert(HostId::new(host), behaviour);
        self
    }

    pub fn host(&self, id: &HostId) -> Option<&Host> {
        self.hosts.iter().find(|h| &h.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_yaml_fixture() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r"
hosts:
  - id: kvm-01
    cluster_id: rack-a
    address: 10.0.0.1
    status: disconnected
    oobm_enabled: true
  - id: kvm-02
    cluster_id: rack-a
    address: 10.0.0.2
    status: up
workloads:
  kvm-01:
    - {{ id: vm-1, state: running }}
volumes:
  vm-1:
    - {{ id: vol-1, pool_id: nfs-1 }}
pools:
  - {{ id: nfs-1, kind: network_filesystem }}
last_writes:
  vol-1: 2026-10-18T10:00:00Z
peers:
  kvm-02:
    reaches: [kvm-01]
"
        )
        .unwrap();
        file.flush().unwrap();

        let fixture = ClusterFixture::load(file.path()).expect("fixture should parse");

        assert_eq!(fixture.hosts.len(), 2);
        assert_eq!(fixture.hosts[1].hypervisor, HypervisorKind::Kvm);
        assert!(!fixture.hosts[1].oobm_enabled);
        assert_eq!(fixture.workloads[&HostId::new("kvm-01")].len(), 1);
        assert!(fixture.agent_counts.is_empty());
        assert!(fixture.peers[&HostId::new("kvm-02")].responsive);
        assert_eq!(fixture.peers[&HostId::new("kvm-02")].reaches, vec![HostId::new("kvm-01")]);
    }

    #[test]
    fn test_builder_places_volume_on_pool() {
        let fixture = ClusterFixture::new()
            .with_host("h1", "c1", HostStatus::Up)
            .with_workload("h1", "vm-1", WorkloadState::Running, "nfs-1");

        let volumes = &fixture.volumes[&WorkloadId::new("vm-1")];
        assert_eq!(volumes[0].id, VolumeId::new("vm-1-root"));
        assert_eq!(volumes[0].pool_id, PoolId::new("nfs-1"));
    }
}
