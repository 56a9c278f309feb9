//! Workloads, volumes and storage pools as seen by the HA subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a guest workload (virtual machine).
    WorkloadId
);
string_id!(
    /// Identifier of a storage pool.
    PoolId
);
string_id!(
    /// Identifier of a volume (disk image).
    VolumeId
);

/// Persisted run-state of a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadState {
    Starting,
    Running,
    Stopping,
    Migrating,
    Stopped,
}

impl WorkloadState {
    /// States in which the hypervisor is expected to report the workload as running.
    ///
    /// `Starting` is excluded: the hypervisor may not see the domain yet.
    pub const EXPECTED_RUNNING: [WorkloadState; 3] =
        [WorkloadState::Running, WorkloadState::Stopping, WorkloadState::Migrating];
}

/// A workload assigned to a host, as recorded in the run-state store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workload {
    pub id: WorkloadId,
    pub state: WorkloadState,
}

/// Storage pool flavours. Only shared kinds can serve as heartbeat evidence,
/// since a peer must be able to see the suspect host's writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    NetworkFilesystem,
    SharedMountPoint,
    ClusteredFilesystem,
    Local,
}

impl PoolKind {
    pub fn is_shared(&self) -> bool {
        !matches!(self, Self::Local)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoragePool {
    pub id: PoolId,
    pub kind: PoolKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: VolumeId,
    pub pool_id: PoolId,
}

/// One (workload, pool, volume) tuple believed to be running on a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadRef {
    pub workload_id: WorkloadId,
    pub pool_id: PoolId,
    pub volume_id: VolumeId,
}

/// Group workload references by the pool that backs them.
pub fn group_by_pool(refs: &[WorkloadRef]) -> BTreeMap<PoolId, Vec<WorkloadRef>> {
    let mut grouped: BTreeMap<PoolId, Vec<WorkloadRef>> = BTreeMap::new();
    for r in refs {
        grouped.entry(r.pool_id.clone()).or_default().push(r.clone());
    }
    grouped
}

/// Moment a host first became suspect. Storage writes strictly after it are proof of life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuspectWindow(pub DateTime<Utc>);

impl SuspectWindow {
    pub fn starting_at(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.0
    }

    /// Evidence counts only when dated strictly after the window opened.
    pub fn is_proof_of_life(&self, last_write: DateTime<Utc>) -> bool {
        last_write > self.0
    }
}
