//! Recovery and fencing through out-of-band management.

use std::sync::Arc;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use crate::domain::errors::OobmError;
use crate::domain::models::{Host, HostStatus};
use crate::domain::ports::{ClusterMembership, OutOfBandManagement, PowerState};
use crate::services::config_registry::HaSettings;

/// Issues recovery and fencing power operations for a suspect host.
pub struct FencingActuator {
    oobm: Arc<dyn OutOfBandManagement>,
    membership: Arc<dyn ClusterMembership>,
}

impl FencingActuator {
    /// Wire the actuator against power management and membership.
    pub fn new(oobm: Arc<dyn OutOfBandManagement>, membership: Arc<dyn ClusterMembership>) -> Self {
        Self { oobm, membership }
    }

    /// Power-cycle the host, bounded by `recover_timeout`.
    #[instrument(skip(self, host, settings), fields(host_id = %host.id))]
    pub async fn recover(&self, host: &Host, settings: &HaSettings) -> Result<(), OobmError> {
        if !host.oobm_enabled {
            return Err(OobmError::NotConfigured(host.id.clone()));
        }

        match timeout(settings.recover_timeout, self.oobm.reset(host)).await {
            Ok(Ok(())) => {
                info!("recovery reset issued");
                Ok(())
            }
            Ok(Err(err)) => {
                warn!(error = %err, "recovery reset failed");
                Err(err)
            }
            Err(_) => {
                warn!(
                    timeout_secs = settings.recover_timeout.as_secs(),
                    "recovery reset timed out"
                );
                Err(OobmError::Timeout(settings.recover_timeout))
            }
        }
    }

    /// Power the host off, confirm it stayed off, then mark it Down.
    ///
    /// The status update only happens once the power state reads `Off`; a host
    /// still drawing power may still be writing to shared storage. Once it reads
    /// `Off` the host counts as fenced even if the status update fails.
    #[instrument(skip(self, host, settings), fields(host_id = %host.id))]
    pub async fn fence(&self, host: &Host, settings: &HaSettings) -> Result<(), OobmError> {
        if !host.oobm_enabled {
            return Err(OobmError::NotConfigured(host.id.clone()));
        }

        let power_off = async {
            self.oobm.power_off(host).await?;
            match self.oobm.power_state(host).await? {
                PowerState::Off => Ok::<(), OobmError>(()),
                state => Err(OobmError::StillPowered {
                    host: host.id.clone(),
                    state: state.to_string(),
                }),
            }
        };

        match timeout(settings.fence_timeout, power_off).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(error = %err, "fencing failed");
                return Err(err);
            }
            Err(_) => {
                warn!(timeout_secs = settings.fence_timeout.as_secs(), "fencing timed out");
                return Err(OobmError::Timeout(settings.fence_timeout));
            }
        }

        match self.membership.update_status(&host.id, HostStatus::Down).await {
            Ok(()) => info!("host fenced and marked down"),
            Err(err) => warn!(error = %err, "host fenced but its status could not be updated"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::HostId;
    use tokio_test::{assert_err, assert_ok};
    use crate::infrastructure::memory::{
        ClusterFixture, InMemoryCluster, OobmBehaviour, OobmCall,
    };

    fn setup(behaviour: OobmBehaviour) -> (Arc<InMemoryCluster>, FencingActuator, Host) {
        let fixture = ClusterFixture::new()
            .with_host("h1", "c1", HostStatus::Disconnected)
            .with_oobm("h1", behaviour);
        let host = fixture.host(&HostId::new("h1")).cloned().unwrap();
        let cluster = Arc::new(InMemoryCluster::new(fixture));
        let actuator = FencingActuator::new(cluster.clone(), cluster.clone());
        (cluster, actuator, host)
    }

    #[tokio::test]
    async fn test_fence_powers_off_and_marks_down() {
        let (cluster, actuator, host) = setup(OobmBehaviour::default());

        assert_ok!(actuator.fence(&host, &HaSettings::default()).await);

        let stored = cluster.get_host(&host.id).await.unwrap();
        assert_eq!(stored.status, HostStatus::Down);
        assert_eq!(cluster.oobm_calls().await, vec![OobmCall::PowerOff(host.id.clone())]);
    }

    #[tokio::test]
    async fn test_failed_power_off_leaves_status_alone() {
        let (cluster, actuator, host) = setup(OobmBehaviour {
            fail_power_off: true,
            ..Default::default()
        });

        let result = actuator.fence(&host, &HaSettings::default()).await;

        assert!(matches!(result, Err(OobmError::Operation(_))));
        let stored = cluster.get_host(&host.id).await.unwrap();
        assert_eq!(stored.status, HostStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_recover_failure_is_reported() {
        let (_, actuator, host) = setup(OobmBehaviour {
            fail_reset: true,
            ..Default::default()
        });

        assert_err!(actuator.recover(&host, &HaSettings::default()).await);
    }

    #[tokio::test]
    async fn test_host_without_oobm_is_rejected() {
        let (cluster, actuator, mut host) = setup(OobmBehaviour::default());
        host.oobm_enabled = false;

        let result = actuator.fence(&host, &HaSettings::default()).await;

        assert_eq!(result, Err(OobmError::NotConfigured(host.id.clone())));
        assert!(cluster.oobm_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_powered_off_host_counts_as_fenced_when_status_update_fails() {
        let (cluster, _, host) = setup(OobmBehaviour::default());
        // membership that does not know the host rejects the status update
        let membership = Arc::new(InMemoryCluster::new(ClusterFixture::new()));
        let actuator = FencingActuator::new(cluster.clone(), membership);

        assert_ok!(actuator.fence(&host, &HaSettings::default()).await);
        assert_eq!(cluster.oobm_calls().await, vec![OobmCall::PowerOff(host.id.clone())]);
    }
}
