//! Neighbor reachability: can peers inside the cluster reach the suspect host?

use futures::future::join_all;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::domain::models::{CheckResult, Host, NeighborReport, Reachability};
use crate::domain::ports::{ClusterMembership, PeerAnswer, PeerChannel, PeerCommand};
use crate::services::config_registry::HaSettings;

pub struct NeighborChecker {
    membership: Arc<dyn ClusterMembership>,
    peers: Arc<dyn PeerChannel>,
}

impl NeighborChecker {
    pub fn new(membership: Arc<dyn ClusterMembership>, peers: Arc<dyn PeerChannel>) -> Self {
        Self { membership, peers }
    }

    /// Ask every Up peer, concurrently, to probe `host` directly.
    #[instrument(skip(self, host, settings), fields(host_id = %host.id))]
    pub async fn check(&self, host: &Host, settings: &HaSettings) -> CheckResult<NeighborReport> {
        let peers = match self.membership.up_peers(host).await {
            Ok(peers) => peers,
            Err(err) => {
                warn!(error = %err, "could not list peers for reachability check");
                return CheckResult::failed(
                    NeighborReport::default(),
                    err,
                    "peer list unavailable",
                );
            }
        };

        let probes = peers.iter().map(|peer| {
            let command = PeerCommand::CheckReachability {
                suspect: host.id.clone(),
                address: host.address.clone(),
            };
            async move {
                match timeout(settings.health_check_timeout, self.peers.send(peer, command)).await
                {
                    Ok(Ok(PeerAnswer::Reachable(reached))) => Some(reached),
                    Ok(Ok(other)) => {
                        warn!(
                            peer = %peer.id,
                            answer = ?other,
                            "unexpected answer to reachability probe"
                        );
                        None
                    }
                    Ok(Err(err)) => {
                        debug!(peer = %peer.id, error = %err, "peer could not probe suspect");
                        None
                    }
                    Err(_) => {
                        debug!(peer = %peer.id, "reachability probe timed out");
                        None
                    }
                }
            }
        });

        let answers = join_all(probes).await;
        let report = NeighborReport {
            probed: peers.len(),
            answered: answers.iter().filter(|a| a.is_some()).count(),
            reached: answers.iter().filter(|a| **a == Some(true)).count(),
        };

        let reason = match report.reachability() {
            Reachability::Reachable => format!(
                "{} of {} peers reached the host",
                report.reached, report.probed
            ),
            Reachability::ConfirmedUnreachable => {
                format!("all {} peers failed to reach the host", report.probed)
            }
            Reachability::Inconclusive => format!(
                "{} of {} peers answered, none reached the host",
                report.answered, report.probed
            ),
        };
        debug!(?report, "{reason}");
        CheckResult::ok(report, reason)
    }
}
