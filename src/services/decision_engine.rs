//! Decision engine: combines the signal probes into one verdict.
//!
//! Signals are consulted in a fixed order, least destructive first:
//! local agent, cluster-wide gate, neighbor reachability, storage activity.
//! Any signal that cannot be resolved lowers the verdict rather than raising it.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::models::{
    ActivityVerdict, Assessment, CheckResult, ClusterHealthSnapshot, HealthSignal, Host,
    NeighborReport, Reachability, SuspectWindow, Verdict,
};
use crate::services::activity_checker::ActivityChecker;
use crate::services::cluster_health::ClusterHealthService;
use crate::services::config_registry::{ConfigRegistry, HaSettings};
use crate::services::local_agent_health::LocalAgentHealthClient;
use crate::services::neighbor_checker::NeighborChecker;
use crate::services::Collaborators;

/// Everything the probes returned for one evaluation.
#[derive(Debug, Clone)]
pub struct Evidence {
    /// Local status agent, compared against the expected workload count
    pub health: CheckResult<HealthSignal>,
    /// Cluster status buckets, or why they could not be read
    pub snapshot: Result<ClusterHealthSnapshot, String>,
    /// Whether Up peers can reach the suspect directly
    pub neighbors: CheckResult<NeighborReport>,
    /// Storage heartbeat over the suspect's shared-pool workloads
    pub activity: CheckResult<ActivityVerdict>,
}

/// Runs the probes for a host and turns their evidence into a [`Verdict`].
pub struct DecisionEngine {
    registry: Arc<ConfigRegistry>,
    local_agent: LocalAgentHealthClient,
    cluster_health: ClusterHealthService,
    neighbors: NeighborChecker,
    activity: ActivityChecker,
}

impl DecisionEngine {
    /// Build the probes from the collaborator ports.
    pub fn new(registry: Arc<ConfigRegistry>, collaborators: &Collaborators) -> Self {
        Self {
            registry,
            local_agent: LocalAgentHealthClient::new(
                collaborators.agent_probe.clone(),
                collaborators.run_state.clone(),
            ),
            cluster_health: ClusterHealthService::new(collaborators.membership.clone()),
            neighbors: NeighborChecker::new(
                collaborators.membership.clone(),
                collaborators.peers.clone(),
            ),
            activity: ActivityChecker::new(
                collaborators.membership.clone(),
                collaborators.run_state.clone(),
                collaborators.volumes.clone(),
                collaborators.peers.clone(),
            ),
        }
    }

    /// Effective tunables for the host's cluster.
    pub fn settings_for(&self, host: &Host) -> HaSettings {
        self.registry.settings(&host.cluster_id)
    }

    /// Local-agent check on its own, for hosts held in the degraded state.
    pub async fn check_health(
        &self,
        host: &Host,
        settings: &HaSettings,
    ) -> CheckResult<HealthSignal> {
        self.local_agent.check(host, settings).await
    }

    #[instrument(
        skip(self, host, window),
        fields(host_id = %host.id, cluster_id = %host.cluster_id)
    )]
    pub async fn evaluate(&self, host: &Host, window: SuspectWindow) -> Assessment {
        if !host.hypervisor.ha_capability().is_eligible() {
            info!(hypervisor = host.hypervisor.as_str(), "hypervisor does not support HA");
            return Assessment::new(Verdict::Ineligible).because(format!(
                "hypervisor {} does not support HA",
                host.hypervisor.as_str()
            ));
        }

        let settings = self.settings_for(host);
        let health = self.local_agent.check(host, &settings).await;
        if health.value == HealthSignal::Healthy {
            return Assessment::new(Verdict::Healthy).because(health.reason);
        }

        let (snapshot, neighbors, activity) = tokio::join!(
            self.cluster_health.snapshot(&host.cluster_id),
            self.neighbors.check(host, &settings),
            self.activity.check(host, window, &settings)
        );

        let evidence = Evidence {
            health,
            snapshot: snapshot.map_err(|e| e.to_string()),
            neighbors,
            activity,
        };
        let assessment = decide(&evidence, settings.accepted_problematic_hosts_ratio);
        info!(
            verdict = %assessment.verdict,
            needs_attention = assessment.needs_attention,
            "host assessed"
        );
        assessment
    }
}

/// Combine probe results into a verdict.
///
/// `Down` requires positive evidence from every signal, with one exception:
/// when storage activity is unknown but every Up peer answered and none reached
/// the host, the neighbors' answer corroborates the agent failure.
pub fn decide(evidence: &Evidence, accepted_ratio: f64) -> Assessment {
    let mut reasons = vec![format!("local agent: {}", evidence.health.reason)];

    if evidence.health.value == HealthSignal::Healthy {
        return Assessment::new(Verdict::Healthy).with_reasons(reasons);
    }

    let snapshot = match &evidence.snapshot {
        Ok(snapshot) => snapshot,
        Err(err) => {
            reasons.push(format!("cluster health unavailable: {err}"));
            return Assessment::new(Verdict::Inconclusive).with_reasons(reasons);
        }
    };

    let ratio = snapshot.problematic_ratio();
    if snapshot.exceeds(accepted_ratio) {
        reasons.push(format!(
            "{} of {} hosts problematic ({ratio:.2} > {accepted_ratio:.2}), suspecting the network",
            snapshot.problematic, snapshot.total
        ));
        return Assessment::new(Verdict::SuspectButSuppressed).with_reasons(reasons);
    }
    reasons.push(format!(
        "{} of {} hosts problematic, within {accepted_ratio:.2}",
        snapshot.problematic, snapshot.total
    ));

    let reachability = evidence.neighbors.value.reachability();
    reasons.push(format!("neighbors: {}", evidence.neighbors.reason));
    if reachability == Reachability::Reachable {
        return Assessment::new(Verdict::SuspectButReachable).with_reasons(reasons);
    }

    reasons.push(format!("storage: {}", evidence.activity.reason));
    match (evidence.activity.value, reachability) {
        (ActivityVerdict::Active, _) => {
            if evidence.health.value == HealthSignal::Unhealthy {
                warn!(
                    "agent reports no running workloads but storage shows activity, not fencing"
                );
                reasons.push("evidence conflict: agent unhealthy, storage active".to_string());
            }
            Assessment::new(Verdict::AliveIsolated)
                .with_reasons(reasons)
                .flag_attention()
        }
        (ActivityVerdict::Inactive, Reachability::ConfirmedUnreachable) => {
            Assessment::new(Verdict::Down).with_reasons(reasons)
        }
        (ActivityVerdict::Unknown, Reachability::ConfirmedUnreachable) => {
            warn!("storage activity unknown, neighbors corroborate host is down");
            reasons.push("storage unknown, corroborated by every Up peer".to_string());
            Assessment::new(Verdict::Down).with_reasons(reasons)
        }
        _ => Assessment::new(Verdict::Inconclusive).with_reasons(reasons),
    }
}
