//! Local-agent health check.
//!
//! Compares the workload count the hypervisor reports through its own status
//! endpoint with the count the run-state store expects. A failed probe means
//! "can't tell", never "host is down".

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::domain::models::{CheckResult, HealthSignal, Host, WorkloadState};
use crate::domain::ports::{AgentStatusProbe, RunStateStore};
use crate::services::config_registry::HaSettings;

pub struct LocalAgentHealthClient {
    probe: Arc<dyn AgentStatusProbe>,
    run_state: Arc<dyn RunStateStore>,
}

impl LocalAgentHealthClient {
    pub fn new(probe: Arc<dyn AgentStatusProbe>, run_state: Arc<dyn RunStateStore>) -> Self {
        Self { probe, run_state }
    }

    /// Workloads the hypervisor should currently report as running.
    async fn expected_count(&self, host: &Host) -> Result<u32, String> {
        let workloads = self
            .run_state
            .workloads_on_host(&host.id, &WorkloadState::EXPECTED_RUNNING)
            .await
            .map_err(|e| e.to_string())?;
        Ok(u32::try_from(workloads.len()).unwrap_or(u32::MAX))
    }

    #[instrument(skip(self, host, settings), fields(host_id = %host.id))]
    pub async fn check(&self, host: &Host, settings: &HaSettings) -> CheckResult<HealthSignal> {
        let (expected, observed) = tokio::join!(
            self.expected_count(host),
            self.probe.running_count(host, settings.health_check_timeout)
        );

        let observed = match observed {
            Ok(count) => count,
            Err(err) => {
                warn!(error = %err, "status agent probe failed");
                return CheckResult::failed(
                    HealthSignal::Unreachable,
                    &err,
                    "status agent could not be queried",
                );
            }
        };

        let expected = match expected {
            Ok(count) => count,
            Err(err) => {
                warn!(error = %err, observed, "run-state lookup failed");
                return CheckResult::failed(
                    HealthSignal::Unreachable,
                    err,
                    "expected workload count unavailable",
                );
            }
        };

        let signal = classify(expected, observed, settings.cautious_margin);
        match signal {
            HealthSignal::Healthy if expected != observed => {
                warn!(
                    expected,
                    observed,
                    "workload count mismatch tolerated (migration or start/stop race)"
                );
                CheckResult::ok(
                    signal,
                    format!("agent reports {observed} of {expected} expected workloads; tolerated"),
                )
            }
            HealthSignal::Healthy => {
                debug!(expected, observed, "workload counts match");
                CheckResult::ok(signal, format!("agent reports all {expected} workloads running"))
            }
            _ => {
                warn!(expected, observed, "host reports no running workloads");
                CheckResult::ok(
                    signal,
                    format!("agent reports 0 running workloads, {expected} expected"),
                )
            }
        }
    }
}

/// Health rule for a successful probe.
///
/// Only a host that lost every workload, beyond the cautious margin, is
/// unhealthy; partial mismatches are normal during migrations.
pub fn classify(expected: u32, observed: u32, cautious_margin: u32) -> HealthSignal {
    // expected > margin >= 0 means a match can never land here
    if observed == 0 && expected > cautious_margin {
        HealthSignal::Unhealthy
    } else {
        HealthSignal::Healthy
    }
}
