//! hostwarden - host failure detection, recovery and fencing
//!
//! When the management plane loses contact with a hypervisor host, hostwarden
//! decides whether the host is really down before anything destructive
//! happens. It combines independent signals:
//!
//! - the host-resident status agent's workload count
//! - a cluster-wide gate on the share of problematic hosts
//! - direct reachability as seen by peer hosts
//! - storage heartbeat: writes to shared storage after the host became suspect
//!
//! Only a `Down` verdict may lead to recovery (out-of-band reset) and then
//! fencing (out-of-band power off).
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and port traits
//! - **Service Layer** (`services`): signal probes, decision engine, escalation
//! - **Infrastructure Layer** (`infrastructure`): HTTP agent probe, in-memory
//!   cluster adapters, configuration and logging
//! - **CLI Layer** (`cli`): the `hostwarden` simulator binary
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hostwarden::{Collaborators, ConfigRegistry, HaSupervisor, HostId};
//!
//! let supervisor = HaSupervisor::new(Arc::new(ConfigRegistry::default()), &collaborators);
//! let evaluation = supervisor.evaluate(&HostId::new("kvm-01")).await?;
//! println!("{} -> {:?}", evaluation.verdict(), evaluation.action);
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{ActivityError, AgentError, OobmError, PeerError, PortError};
pub use domain::models::{
    Action, ActionOutcome, ActivityVerdict, Assessment, ClusterId, Config, EscalationRecord,
    EscalationState, Evaluation, HaConfig, HaOverrides, HealthSignal, Host, HostId, HostStatus,
    HypervisorKind, SuspectWindow, Verdict,
};
pub use domain::ports::{
    AgentStatusProbe, ClusterMembership, OutOfBandManagement, PeerChannel, RunStateStore,
    VolumeDirectory,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{Collaborators, ConfigRegistry, DecisionEngine, HaSettings, HaSupervisor};
