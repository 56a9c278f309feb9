//! Verdicts produced by the decision engine and actions taken on them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::escalation::EscalationState;
use super::host::HostId;

/// Classification of a suspect host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Healthy,
    /// Too much of the cluster is problematic; suspect the network, not the host.
    SuspectButSuppressed,
    /// A peer reached the host; only the management plane lost it.
    SuspectButReachable,
    /// Storage shows the host is still writing. Needs operator attention.
    AliveIsolated,
    /// Some signal could not be resolved; nothing destructive is warranted.
    Inconclusive,
    /// No activity, no reachability, no suppression.
    Down,
    /// The hypervisor kind does not support HA.
    Ineligible,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::SuspectButSuppressed => "suspect_but_suppressed",
            Self::SuspectButReachable => "suspect_but_reachable",
            Self::AliveIsolated => "alive_isolated",
            Self::Inconclusive => "inconclusive",
            Self::Down => "down",
            Self::Ineligible => "ineligible",
        }
    }

    /// Only a `Down` verdict may lead to recovery or fencing.
    pub fn permits_action(&self) -> bool {
        matches!(self, Self::Down)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The engine's verdict together with the evidence trail that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub verdict: Verdict,
    /// Human-readable reasons, one per signal consulted, in order.
    pub reasons: Vec<String>,
    /// Set when an operator should look at the host (evidence conflicts, isolation).
    pub needs_attention: bool,
}

impl Assessment {
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            reasons: Vec::new(),
            needs_attention: false,
        }
    }

    pub fn because(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }

    pub fn with_reasons(mut self, reasons: Vec<String>) -> Self {
        self.reasons = reasons;
        self
    }

    pub fn flag_attention(mut self) -> Self {
        self.needs_attention = true;
        self
    }
}

/// Power operation the escalation driver may request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    None,
    /// Waiting for a previous recovery to take effect.
    AwaitRecovery,
    Recover,
    Fence,
    /// Escalation wanted to act but could not (e.g. no out-of-band management).
    Skipped { reason: String },
}

impl Action {
    pub fn is_power_operation(&self) -> bool {
        matches!(self, Self::Recover | Self::Fence)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    NotAttempted,
    Succeeded,
    Failed { error: String },
}

/// Result of one management-plane evaluation cycle for a host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub evaluation_id: Uuid,
    pub host_id: HostId,
    pub assessment: Assessment,
    pub action: Action,
    pub outcome: ActionOutcome,
    /// Escalation state after this evaluation.
    pub state: EscalationState,
    pub evaluated_at: DateTime<Utc>,
}

impl Evaluation {
    pub fn verdict(&self) -> Verdict {
        self.assessment.verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_down_permits_action() {
        for verdict in [
            Verdict::Healthy,
            Verdict::SuspectButSuppressed,
            Verdict::SuspectButReachable,
            Verdict::AliveIsolated,
            Verdict::Inconclusive,
            Verdict::Ineligible,
        ] {
            assert!(!verdict.permits_action(), "{verdict} must not permit action");
        }
        assert!(Verdict::Down.permits_action());
    }

    #[test]
    fn test_assessment_builder() {
        let assessment = Assessment::new(Verdict::AliveIsolated)
            .because("agent unreachable")
            .because("storage active")
            .flag_attention();

        assert_eq!(assessment.reasons.len(), 2);
        assert!(assessment.needs_attention);
    }

    #[test]
    fn test_action_serializes_tagged() {
        let json = serde_json::to_value(Action::Skipped { reason: "no oobm".into() }).unwrap();
        assert_eq!(json["kind"], "skipped");
        assert_eq!(json["reason"], "no oobm");
    }
}
