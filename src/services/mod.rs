//! Service layer for the HA subsystem
//!
//! Signal probes, the decision engine that combines them, and the escalation
//! driver that turns verdicts into power operations.

pub mod activity_checker;
pub mod cluster_health;
pub mod config_registry;
pub mod decision_engine;
pub mod escalation;
pub mod fencing;
pub mod local_agent_health;
pub mod neighbor_checker;

use std::sync::Arc;

use crate::domain::ports::{
    AgentStatusProbe, ClusterMembership, OutOfBandManagement, PeerChannel, RunStateStore,
    VolumeDirectory,
};
use crate::infrastructure::memory::InMemoryCluster;

pub use activity_checker::ActivityChecker;
pub use cluster_health::ClusterHealthService;
pub use config_registry::{ConfigRegistry, HaSettings};
pub use decision_engine::{decide, DecisionEngine, Evidence};
pub use escalation::{next_action, HaSupervisor};
pub use fencing::FencingActuator;
pub use local_agent_health::LocalAgentHealthClient;
pub use neighbor_checker::NeighborChecker;

/// Port implementations the services are wired against.
#[derive(Clone)]
pub struct Collaborators {
    pub membership: Arc<dyn ClusterMembership>,
    pub run_state: Arc<dyn RunStateStore>,
    pub volumes: Arc<dyn VolumeDirectory>,
    pub oobm: Arc<dyn OutOfBandManagement>,
    pub peers: Arc<dyn PeerChannel>,
    pub agent_probe: Arc<dyn AgentStatusProbe>,
}

impl Collaborators {
    /// Serve every port from one in-memory cluster.
    pub fn from_cluster(cluster: Arc<InMemoryCluster>) -> Self {
        Self {
            membership: cluster.clone(),
            run_state: cluster.clone(),
            volumes: cluster.clone(),
            oobm: cluster.clone(),
            peers: cluster.clone(),
            agent_probe: cluster,
        }
    }

    /// Replace the agent probe, e.g. with the HTTP probe.
    pub fn with_agent_probe(mut self, probe: Arc<dyn AgentStatusProbe>) -> Self {
        self.agent_probe = probe;
        self
    }
}
