//! Storage-based heartbeat.
//!
//! A host that is really running a workload is the only writer of that
//! workload's disk image, so writes after the suspect window are proof of
//! life. The suspect host cannot be trusted to report on itself; Up peers in
//! the same cluster inspect the shared pools on its behalf.

use futures::future::join_all;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{ActivityError, PeerError};
use crate::domain::models::{
    group_by_pool, ActivityVerdict, CheckResult, Host, PoolId, SuspectWindow, WorkloadRef,
    WorkloadState,
};
use crate::domain::ports::{
    ClusterMembership, PeerAnswer, PeerChannel, PeerCommand, RunStateStore, VolumeDirectory,
};
use crate::services::config_registry::HaSettings;

/// Decides whether a suspect host is still writing to its shared storage.
pub struct ActivityChecker {
    membership: Arc<dyn ClusterMembership>,
    run_state: Arc<dyn RunStateStore>,
    volumes: Arc<dyn VolumeDirectory>,
    peers: Arc<dyn PeerChannel>,
}

impl ActivityChecker {
    /// Wire the checker against its collaborator ports.
    pub fn new(
        membership: Arc<dyn ClusterMembership>,
        run_state: Arc<dyn RunStateStore>,
        volumes: Arc<dyn VolumeDirectory>,
        peers: Arc<dyn PeerChannel>,
    ) -> Self {
        Self {
            membership,
            run_state,
            volumes,
            peers,
        }
    }

    /// Workload references on shared pools for the workloads believed to run on `host`.
    ///
    /// Volumes on local pools are skipped: no peer can observe them.
    pub async fn workload_refs(&self, host: &Host) -> Result<Vec<WorkloadRef>, ActivityError> {
        let workloads = self
            .run_state
            .workloads_on_host(&host.id, &WorkloadState::EXPECTED_RUNNING)
            .await?;

        let mut refs = Vec::new();
        for workload in workloads {
            for volume in self.volumes.volumes_for(&workload.id).await? {
                let pool = self.volumes.pool(&volume.pool_id).await?;
                if !pool.kind.is_shared() {
                    debug!(pool_id = %pool.id, volume_id = %volume.id, "skipping local pool");
                    continue;
                }
                refs.push(WorkloadRef {
                    workload_id: workload.id.clone(),
                    pool_id: volume.pool_id,
                    volume_id: volume.id,
                });
            }
        }
        Ok(refs)
    }

    /// One activity probe across every pool backing `refs`.
    ///
    /// Pools are probed concurrently and their answers ORed: one active pool is
    /// enough, even if others failed.
    pub async fn check_once(
        &self,
        host: &Host,
        refs: &[WorkloadRef],
        window: SuspectWindow,
        settings: &HaSettings,
    ) -> Result<bool, ActivityError> {
        if refs.is_empty() {
            return Err(ActivityError::NoEvidence);
        }

        let peers = self.membership.up_peers(host).await?;
        let grouped = group_by_pool(refs);

        let probes = grouped.into_iter().map(|(pool, workloads)| {
            self.probe_pool(host, &peers, pool, workloads, window, settings)
        });
        let results = join_all(probes).await;

        if results.iter().any(|r| matches!(r, Ok(true))) {
            return Ok(true);
        }
        match results.into_iter().find_map(Result::err) {
            Some(err) => Err(err),
            None => Ok(false),
        }
    }

    /// Ask peers in order until one answers for `pool`.
    ///
    /// The whole fallback shares one `activity_check_timeout`; a slow peer uses
    /// up the budget of the ones behind it.
    async fn probe_pool(
        &self,
        host: &Host,
        peers: &[Host],
        pool: PoolId,
        workloads: Vec<WorkloadRef>,
        window: SuspectWindow,
        settings: &HaSettings,
    ) -> Result<bool, ActivityError> {
        let fallback = self.ask_peers(host, peers, &pool, &workloads, window);
        match timeout(settings.activity_check_timeout, fallback).await {
            Ok(result) => result,
            Err(_) => {
                debug!(
                    pool_id = %pool,
                    timeout_secs = settings.activity_check_timeout.as_secs(),
                    "activity probe timed out"
                );
                Err(ActivityError::Timeout(settings.activity_check_timeout))
            }
        }
    }

    async fn ask_peers(
        &self,
        host: &Host,
        peers: &[Host],
        pool: &PoolId,
        workloads: &[WorkloadRef],
        window: SuspectWindow,
    ) -> Result<bool, ActivityError> {
        for peer in peers {
            let command = PeerCommand::CheckActivity {
                suspect: host.id.clone(),
                pool: pool.clone(),
                workloads: workloads.to_vec(),
                since: window,
            };

            match self.peers.send(peer, command).await {
                Ok(PeerAnswer::Activity(active)) => {
                    debug!(peer = %peer.id, pool_id = %pool, active, "activity answer");
                    return Ok(active);
                }
                Ok(_) => {
                    warn!(
                        peer = %peer.id,
                        error = %PeerError::UnexpectedAnswer(peer.id.clone()),
                        "trying next peer"
                    );
                }
                Err(err) if err.try_next_peer() => {
                    debug!(peer = %peer.id, pool_id = %pool, error = %err, "trying next peer");
                }
                Err(err) => {
                    warn!(peer = %peer.id, pool_id = %pool, error = %err, "storage unavailable");
                    return Err(ActivityError::StorageUnavailable(pool.clone()));
                }
            }
        }
        Err(ActivityError::NoResponsivePeer(pool.clone()))
    }

    /// Repeated probing with a failure-ratio quorum.
    ///
    /// Any probe showing activity ends the check as `Active`. Otherwise at least
    /// `ceil(failure_ratio * max_attempts)` probes must report no activity for
    /// `Inactive`; anything less is `Unknown`.
    #[instrument(skip(self, host, window, settings), fields(host_id = %host.id))]
    pub async fn check(
        &self,
        host: &Host,
        window: SuspectWindow,
        settings: &HaSettings,
    ) -> CheckResult<ActivityVerdict> {
        let refs = match self.workload_refs(host).await {
            Ok(refs) if refs.is_empty() => {
                return CheckResult::failed(
                    ActivityVerdict::Unknown,
                    ActivityError::NoEvidence,
                    "no shared-storage workloads to inspect",
                );
            }
            Ok(refs) => refs,
            Err(err) => {
                warn!(error = %err, "could not resolve workload storage");
                return CheckResult::failed(
                    ActivityVerdict::Unknown,
                    err,
                    "workload storage lookup failed",
                );
            }
        };

        let max_attempts = settings.activity_check_max_attempts;
        let quorum = settings.inactive_quorum();
        let mut inactive = 0u32;
        let mut last_error: Option<ActivityError> = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                sleep(settings.activity_check_interval).await;
            }

            match self.check_once(host, &refs, window, settings).await {
                Ok(true) => {
                    info!(attempt, "storage activity detected after suspect window");
                    return CheckResult::ok(
                        ActivityVerdict::Active,
                        format!("storage activity after suspect window on attempt {attempt}"),
                    );
                }
                Ok(false) => inactive += 1,
                Err(err) => {
                    debug!(attempt, error = %err, "inconclusive activity probe");
                    last_error = Some(err);
                }
            }

            let remaining = max_attempts - attempt;
            if inactive + remaining < quorum {
                break;
            }
        }

        if inactive >= quorum {
            CheckResult::ok(
                ActivityVerdict::Inactive,
                format!("{inactive} of {max_attempts} probes saw no activity (quorum {quorum})"),
            )
        } else {
            let reason = format!(
                "only {inactive} of {max_attempts} probes saw no activity (quorum {quorum})"
            );
            match last_error {
                Some(err) => CheckResult::failed(ActivityVerdict::Unknown, err, reason),
                None => CheckResult::ok(ActivityVerdict::Unknown, reason),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{HostId, HostStatus, PoolKind};
    use crate::infrastructure::memory::{ClusterFixture, InMemoryCluster, PeerBehaviour};
    use chrono::{Duration as ChronoDuration, Utc};
    use std::time::Duration;

    fn checker(fixture: ClusterFixture) -> (Arc<InMemoryCluster>, ActivityChecker) {
        let cluster = Arc::new(InMemoryCluster::new(fixture));
        let checker = ActivityChecker::new(
            cluster.clone(),
            cluster.clone(),
            cluster.clone(),
            cluster.clone(),
        );
        (cluster, checker)
    }

    fn base() -> ClusterFixture {
        ClusterFixture::new()
            .with_host("suspect", "c1", HostStatus::Disconnected)
            .with_host("p1", "c1", HostStatus::Up)
            .with_host("p2", "c1", HostStatus::Up)
            .with_pool("nfs-1", PoolKind::NetworkFilesystem)
            .with_pool("nfs-2", PoolKind::NetworkFilesystem)
            .with_pool("local", PoolKind::Local)
            .with_workload("suspect", "vm-1", WorkloadState::Running, "nfs-1")
            .with_workload("suspect", "vm-2", WorkloadState::Running, "nfs-2")
    }

    fn fast() -> HaSettings {
        HaSettings {
            activity_check_interval: Duration::from_millis(1),
            activity_check_timeout: Duration::from_secs(1),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_local_pools_are_skipped() {
        let (cluster, checker) =
            checker(base().with_workload("suspect", "vm-3", WorkloadState::Running, "local"));
        let host = cluster.get_host(&HostId::new("suspect")).await.unwrap();

        let refs = checker.workload_refs(&host).await.unwrap();

        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|r| r.pool_id.as_str() != "local"));
    }

    #[tokio::test]
    async fn test_single_active_pool_is_proof_of_life() {
        let window = SuspectWindow::starting_at(Utc::now());
        let (cluster, checker) = checker(
            base().with_last_write("vm-2-root", window.started_at() + ChronoDuration::seconds(3)),
        );
        let host = cluster.get_host(&HostId::new("suspect")).await.unwrap();

        let result = checker.check(&host, window, &fast()).await;

        assert_eq!(result.value, ActivityVerdict::Active);
    }

    #[tokio::test]
    async fn test_writes_before_window_do_not_count() {
        let window = SuspectWindow::starting_at(Utc::now());
        let (cluster, checker) = checker(
            base().with_last_write("vm-1-root", window.started_at() - ChronoDuration::seconds(3)),
        );
        let host = cluster.get_host(&HostId::new("suspect")).await.unwrap();

        let result = checker.check(&host, window, &fast()).await;

        assert_eq!(result.value, ActivityVerdict::Inactive);
        assert!(result.reason.contains("10 of 10"));
    }

    #[tokio::test]
    async fn test_unresponsive_peer_falls_through_to_next() {
        let (cluster, checker) = checker(base().with_peer(
            "p1",
            PeerBehaviour {
                responsive: false,
                ..Default::default()
            },
        ));
        let host = cluster.get_host(&HostId::new("suspect")).await.unwrap();
        let refs = checker.workload_refs(&host).await.unwrap();
        let window = SuspectWindow::starting_at(Utc::now());

        let once = checker.check_once(&host, &refs, window, &fast()).await;

        assert_eq!(once, Ok(false));
    }

    #[tokio::test]
    async fn test_no_responsive_peer_is_inconclusive() {
        let silent = PeerBehaviour {
            responsive: false,
            ..Default::default()
        };
        let (cluster, checker) =
            checker(base().with_peer("p1", silent.clone()).with_peer("p2", silent));
        let host = cluster.get_host(&HostId::new("suspect")).await.unwrap();
        let window = SuspectWindow::starting_at(Utc::now());

        let result = checker.check(&host, window, &fast()).await;

        assert_eq!(result.value, ActivityVerdict::Unknown);
        assert!(result.error.unwrap().contains("No responsive peer"));
    }

    #[tokio::test]
    async fn test_storage_unavailable_is_distinguishable() {
        let (cluster, checker) = checker(base().with_peer(
            "p1",
            PeerBehaviour {
                unavailable_pools: vec![PoolId::new("nfs-1")],
                ..Default::default()
            },
        ));
        let host = cluster.get_host(&HostId::new("suspect")).await.unwrap();
        let refs = checker.workload_refs(&host).await.unwrap();
        let window = SuspectWindow::starting_at(Utc::now());

        let once = checker.check_once(&host, &refs, window, &fast()).await;

        assert_eq!(once, Err(ActivityError::StorageUnavailable(PoolId::new("nfs-1"))));
    }

    #[tokio::test]
    async fn test_no_workloads_is_no_evidence() {
        let (cluster, checker) = checker(
            ClusterFixture::new()
                .with_host("suspect", "c1", HostStatus::Disconnected)
                .with_host("p1", "c1", HostStatus::Up),
        );
        let host = cluster.get_host(&HostId::new("suspect")).await.unwrap();

        let result = checker
            .check(&host, SuspectWindow::starting_at(Utc::now()), &fast())
            .await;

        assert_eq!(result.value, ActivityVerdict::Unknown);
        assert_eq!(result.error.as_deref(), Some(ActivityError::NoEvidence.to_string().as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probes_are_paced_by_interval() {
        let (cluster, checker) = checker(base());
        let host = cluster.get_host(&HostId::new("suspect")).await.unwrap();
        let settings = HaSettings {
            activity_check_max_attempts: 3,
            activity_check_interval: Duration::from_secs(60),
            ..Default::default()
        };

        let started = tokio::time::Instant::now();
        let result = checker
            .check(&host, SuspectWindow::starting_at(Utc::now()), &settings)
            .await;

        assert_eq!(result.value, ActivityVerdict::Inactive);
        assert_eq!(started.elapsed(), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_peers_share_one_timeout_per_attempt() {
        let slow = PeerBehaviour {
            latency_ms: 3_600_000,
            ..Default::default()
        };
        let (cluster, checker) = checker(
            base()
                .with_host("p3", "c1", HostStatus::Up)
                .with_host("p4", "c1", HostStatus::Up)
                .with_peer("p1", slow.clone())
                .with_peer("p2", slow.clone())
                .with_peer("p3", slow.clone())
                .with_peer("p4", slow),
        );
        let host = cluster.get_host(&HostId::new("suspect")).await.unwrap();
        let settings = HaSettings::default();

        let started = tokio::time::Instant::now();
        let result = checker
            .check(&host, SuspectWindow::starting_at(Utc::now()), &settings)
            .await;

        assert_eq!(result.value, ActivityVerdict::Unknown);
        assert_eq!(
            result.error.as_deref(),
            Some(ActivityError::Timeout(Duration::from_secs(60)).to_string().as_str())
        );
        // quorum of 7 is out of reach after 4 timed-out attempts
        assert_eq!(started.elapsed(), Duration::from_secs(420));
    }
}
