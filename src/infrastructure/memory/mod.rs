//! In-memory collaborator adapters
//!
//! A [`ClusterFixture`] describes hosts, workloads, storage and peer behaviour;
//! [`InMemoryCluster`] serves every HA port from it. Used by the CLI
//! simulator and by tests.

pub mod cluster;
pub mod fixture;

pub use cluster::{InMemoryCluster, OobmCall};
pub use fixture::{ClusterFixture, OobmBehaviour, PeerBehaviour};
