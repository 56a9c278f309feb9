//! Common test utilities for integration tests
//!
//! Provides shared cluster fixtures and wiring used across
//! multiple integration test files.

use std::sync::Arc;

use hostwarden::domain::models::{ClusterId, HaOverrides, HostStatus, PoolKind, WorkloadState};
use hostwarden::infrastructure::memory::{ClusterFixture, InMemoryCluster};
use hostwarden::services::{Collaborators, ConfigRegistry, HaSupervisor};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Five KVM hosts in cluster `c1`: the suspect `kvm-01` (Disconnected) and
/// four Up peers. `kvm-01` runs three workloads on one NFS pool.
#[allow(dead_code)]
pub fn five_host_cluster() -> ClusterFixture {
    ClusterFixture::new()
        .with_host("kvm-01", "c1", HostStatus::Disconnected)
        .with_host("kvm-02", "c1", HostStatus::Up)
        .with_host("kvm-03", "c1", HostStatus::Up)
        .with_host("kvm-04", "c1", HostStatus::Up)
        .with_host("kvm-05", "c1", HostStatus::Up)
        .with_pool("nfs-1", PoolKind::NetworkFilesystem)
        .with_workload("kvm-01", "vm-1", WorkloadState::Running, "nfs-1")
        .with_workload("kvm-01", "vm-2", WorkloadState::Running, "nfs-1")
        .with_workload("kvm-01", "vm-3", WorkloadState::Migrating, "nfs-1")
}

/// Registry for `c1` with activity probing compressed to a few instant attempts.
#[allow(dead_code)]
pub fn fast_registry() -> ConfigRegistry {
    ConfigRegistry::default().with_cluster(
        ClusterId::new("c1"),
        HaOverrides {
            activity_check_interval_secs: Some(0),
            activity_check_max_attempts: Some(3),
            ..Default::default()
        },
    )
}

#[allow(dead_code)]
pub fn supervisor(
    fixture: ClusterFixture,
    registry: ConfigRegistry,
) -> (Arc<InMemoryCluster>, HaSupervisor) {
    let cluster = Arc::new(InMemoryCluster::new(fixture));
    let supervisor = HaSupervisor::new(
        Arc::new(registry),
        &Collaborators::from_cluster(cluster.clone()),
    );
    (cluster, supervisor)
}
