//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces for every collaborator the HA subsystem consumes:
//! - ClusterMembership: host records and status transitions
//! - RunStateStore: workloads believed to be on a host
//! - VolumeDirectory: workload volumes and their pools
//! - OutOfBandManagement: power control
//! - PeerChannel: "check on my behalf" requests to other hosts
//! - AgentStatusProbe: the host-resident status endpoint

pub mod agent_probe;
pub mod cluster_membership;
pub mod oobm;
pub mod peer_channel;
pub mod run_state;
pub mod volume_directory;

pub use agent_probe::AgentStatusProbe;
pub use cluster_membership::ClusterMembership;
pub use oobm::{OutOfBandManagement, PowerState};
pub use peer_channel::{PeerAnswer, PeerChannel, PeerCommand};
pub use run_state::RunStateStore;
pub use volume_directory::VolumeDirectory;
