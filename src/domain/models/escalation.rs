//! Per-host escalation bookkeeping held by the management-plane side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::workload::SuspectWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationState {
    #[default]
    Monitoring,
    Suspect,
    /// Host is alive but isolated; only health checks run until the degraded period ends.
    Degraded,
    RecoveryAttempted,
    Fenced,
}

impl EscalationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monitoring => "monitoring",
            Self::Suspect => "suspect",
            Self::Degraded => "degraded",
            Self::RecoveryAttempted => "recovery_attempted",
            Self::Fenced => "fenced",
        }
    }
}

impl fmt::Display for EscalationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Escalation memory for one host across evaluation cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub state: EscalationState,
    pub suspect_since: Option<DateTime<Utc>>,
    pub degraded_since: Option<DateTime<Utc>>,
    /// Recovery attempts since the last healthy check, successful or not.
    pub recovery_attempts: u32,
    pub last_recovery_at: Option<DateTime<Utc>>,
    pub fenced_at: Option<DateTime<Utc>>,
}

impl EscalationRecord {
    /// Suspect window for this cycle, opening it now if the host was not yet suspect.
    pub fn suspect_window(&self, now: DateTime<Utc>) -> SuspectWindow {
        SuspectWindow::starting_at(self.suspect_since.unwrap_or(now))
    }

    pub fn mark_suspect(&mut self, now: DateTime<Utc>) {
        if self.suspect_since.is_none() {
            self.suspect_since = Some(now);
        }
    }

    /// Forget everything; the host passed a health check.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn enter(&mut self, state: EscalationState) {
        self.state = state;
    }
}
