//! Domain models for the HA subsystem.

pub mod check;
pub mod config;
pub mod escalation;
pub mod host;
pub mod hypervisor;
pub mod verdict;
pub mod workload;

pub use check::{
    ActivityVerdict, CheckResult, ClusterHealthSnapshot, HealthSignal, NeighborReport,
    Reachability,
};
pub use config::{AgentConfig, Config, HaConfig, HaOverrides, LoggingConfig};
pub use escalation::{EscalationRecord, EscalationState};
pub use host::{ClusterId, Host, HostId, HostStatus};
pub use hypervisor::{HaCapability, HypervisorKind};
pub use verdict::{Action, ActionOutcome, Assessment, Evaluation, Verdict};
pub use workload::{
    group_by_pool, PoolId, PoolKind, StoragePool, SuspectWindow, Volume, VolumeId, Workload,
    WorkloadId, WorkloadRef, WorkloadState,
};
