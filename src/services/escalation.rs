//! Escalation driver.
//!
//! Turns verdicts into at most one power operation per evaluation, remembering
//! per host where the escalation stands. Evaluations of the same host are
//! serialized; different hosts evaluate concurrently.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::errors::PortError;
use crate::domain::models::{
    Action, ActionOutcome, Assessment, EscalationRecord, EscalationState, Evaluation,
    HealthSignal, Host, HostId, Verdict,
};
use crate::domain::ports::ClusterMembership;
use crate::services::config_registry::{ConfigRegistry, HaSettings};
use crate::services::decision_engine::DecisionEngine;
use crate::services::fencing::FencingActuator;
use crate::services::Collaborators;

/// Next escalation step for a host judged `Down`.
pub fn next_action(
    record: &EscalationRecord,
    host: &Host,
    settings: &HaSettings,
    now: DateTime<Utc>,
) -> Action {
    if record.state == EscalationState::Fenced {
        return Action::None;
    }
    if !host.oobm_enabled {
        return Action::Skipped {
            reason: "out-of-band management not configured".to_string(),
        };
    }
    if record.state == EscalationState::RecoveryAttempted {
        if let Some(last) = record.last_recovery_at {
            if within(last, settings.recover_wait_period, now) {
                return Action::AwaitRecovery;
            }
        }
    }
    if record.recovery_attempts < settings.recover_attempt_threshold {
        Action::Recover
    } else {
        Action::Fence
    }
}

/// Drives each host's escalation record from verdicts to power operations.
///
/// Evaluations of the same host are serialized; different hosts run independently.
pub struct HaSupervisor {
    membership: Arc<dyn ClusterMembership>,
    engine: DecisionEngine,
    actuator: FencingActuator,
    records: RwLock<HashMap<HostId, Arc<Mutex<EscalationRecord>>>>,
}

impl HaSupervisor {
    /// Wire the engine and actuator against the collaborator ports.
    pub fn new(registry: Arc<ConfigRegistry>, collaborators: &Collaborators) -> Self {
        Self {
            membership: collaborators.membership.clone(),
            engine: DecisionEngine::new(registry, collaborators),
            actuator: FencingActuator::new(
                collaborators.oobm.clone(),
                collaborators.membership.clone(),
            ),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Decision engine used for every evaluation.
    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// Current escalation record, if the host has been evaluated.
    pub async fn record(&self, host_id: &HostId) -> Option<EscalationRecord> {
        let slot = self.records.read().await.get(host_id).cloned()?;
        let record = slot.lock().await.clone();
        Some(record)
    }

    /// Seed escalation state, e.g. after a management-server restart.
    pub async fn restore(&self, host_id: HostId, record: EscalationRecord) {
        self.records
            .write()
            .await
            .insert(host_id, Arc::new(Mutex::new(record)));
    }

    async fn slot(&self, host_id: &HostId) -> Arc<Mutex<EscalationRecord>> {
        if let Some(slot) = self.records.read().await.get(host_id) {
            return slot.clone();
        }
        self.records
            .write()
            .await
            .entry(host_id.clone())
            .or_default()
            .clone()
    }

    pub async fn evaluate(&self, host_id: &HostId) -> Result<Evaluation, PortError> {
        self.evaluate_at(host_id, Utc::now()).await
    }

    /// Evaluate several hosts concurrently.
    pub async fn evaluate_many(&self, host_ids: &[HostId]) -> Vec<Result<Evaluation, PortError>> {
        join_all(host_ids.iter().map(|id| self.evaluate(id))).await
    }

    /// One evaluation cycle as of `now`.
    pub async fn evaluate_at(
        &self,
        host_id: &HostId,
        now: DateTime<Utc>,
    ) -> Result<Evaluation, PortError> {
        let evaluation_id = Uuid::new_v4();
        let span = info_span!("evaluation", %evaluation_id, host_id = %host_id);

        async {
            let host = self.membership.get_host(host_id).await?;
            let slot = self.slot(host_id).await;
            let mut record = slot.lock().await;
            let settings = self.engine.settings_for(&host);

            let (assessment, action, outcome) = if in_degraded_hold(&record, &settings, now) {
                let assessment = self.degraded_check(&host, &settings, &mut record).await;
                (assessment, Action::None, ActionOutcome::NotAttempted)
            } else {
                let window = record.suspect_window(now);
                let assessment = self.engine.evaluate(&host, window).await;
                let (action, outcome) = self
                    .escalate(&host, &assessment, &settings, &mut record, now)
                    .await;
                (assessment, action, outcome)
            };

            info!(
                verdict = %assessment.verdict,
                state = %record.state,
                action = ?action,
                "evaluation complete"
            );

            Ok::<_, PortError>(Evaluation {
                evaluation_id,
                host_id: host_id.clone(),
                assessment,
                action,
                outcome,
                state: record.state,
                evaluated_at: now,
            })
        }
        .instrument(span)
        .await
    }

    /// Health-only check for a host held in `Degraded`.
    async fn degraded_check(
        &self,
        host: &Host,
        settings: &HaSettings,
        record: &mut EscalationRecord,
    ) -> Assessment {
        let health = self.engine.check_health(host, settings).await;
        if health.value == HealthSignal::Healthy {
            info!("degraded host passed health check");
            record.reset();
            return Assessment::new(Verdict::Healthy).because(health.reason);
        }
        Assessment::new(Verdict::AliveIsolated)
            .because(health.reason)
            .because("holding in degraded state")
            .flag_attention()
    }

    async fn escalate(
        &self,
        host: &Host,
        assessment: &Assessment,
        settings: &HaSettings,
        record: &mut EscalationRecord,
        now: DateTime<Utc>,
    ) -> (Action, ActionOutcome) {
        let none = (Action::None, ActionOutcome::NotAttempted);

        match assessment.verdict {
            Verdict::Healthy => {
                if record.state != EscalationState::Monitoring {
                    info!(previous = %record.state, "host healthy again, resetting escalation");
                }
                record.reset();
                none
            }
            Verdict::Ineligible => none,
            Verdict::SuspectButSuppressed
            | Verdict::SuspectButReachable
            | Verdict::Inconclusive => {
                record.mark_suspect(now);
                if matches!(
                    record.state,
                    EscalationState::Monitoring | EscalationState::Degraded
                ) {
                    record.enter(EscalationState::Suspect);
                }
                none
            }
            Verdict::AliveIsolated => {
                record.mark_suspect(now);
                if record.state != EscalationState::Fenced {
                    record.enter(EscalationState::Degraded);
                    record.degraded_since = Some(now);
                }
                none
            }
            Verdict::Down => {
                record.mark_suspect(now);
                if matches!(
                    record.state,
                    EscalationState::Monitoring | EscalationState::Degraded
                ) {
                    record.enter(EscalationState::Suspect);
                }

                let action = next_action(record, host, settings, now);
                let outcome = self.act(host, &action, settings, record, now).await;
                (action, outcome)
            }
        }
    }

    /// Invoke the actuator for a power operation and advance the record on success.
    async fn act(
        &self,
        host: &Host,
        action: &Action,
        settings: &HaSettings,
        record: &mut EscalationRecord,
        now: DateTime<Utc>,
    ) -> ActionOutcome {
        let result = match action {
            Action::Recover => {
                record.recovery_attempts += 1;
                record.last_recovery_at = Some(now);
                info!(attempt = record.recovery_attempts, "attempting recovery");
                self.actuator
                    .recover(host, settings)
                    .await
                    .map(|()| EscalationState::RecoveryAttempted)
            }
            Action::Fence => {
                info!("fencing host");
                self.actuator
                    .fence(host, settings)
                    .await
                    .map(|()| EscalationState::Fenced)
            }
            Action::Skipped { reason } => {
                warn!(reason = %reason, "host judged down but cannot be acted on");
                return ActionOutcome::NotAttempted;
            }
            Action::None | Action::AwaitRecovery => return ActionOutcome::NotAttempted,
        };

        match result {
            Ok(state) => {
                record.enter(state);
                if state == EscalationState::Fenced {
                    record.fenced_at = Some(now);
                }
                ActionOutcome::Succeeded
            }
            Err(err) => {
                warn!(
                    error = %err,
                    action = ?action,
                    "power operation failed, escalation not advanced"
                );
                ActionOutcome::Failed {
                    error: err.to_string(),
                }
            }
        }
    }
}

fn in_degraded_hold(record: &EscalationRecord, settings: &HaSettings, now: DateTime<Utc>) -> bool {
    if record.state != EscalationState::Degraded {
        return false;
    }
    record
        .degraded_since
        .is_some_and(|since| within(since, settings.degraded_max_period, now))
}

/// Whether `now` falls before `start + period`.
fn within(start: DateTime<Utc>, period: std::time::Duration, now: DateTime<Utc>) -> bool {
    chrono::Duration::from_std(period)
        .ok()
        .and_then(|period| start.checked_add_signed(period))
        .map_or(true, |until| now < until)
}
