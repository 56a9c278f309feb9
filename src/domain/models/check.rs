//! Outcomes of individual signal probes.
//!
//! These are ephemeral: produced by a checker, consumed by the decision engine
//! in the same evaluation, never persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::host::{Host, HostStatus};

/// Outcome of one signal probe with the reason it was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult<T> {
    pub value: T,
    pub error: Option<String>,
    pub reason: String,
}

impl<T> CheckResult<T> {
    pub fn ok(value: T, reason: impl Into<String>) -> Self {
        Self {
            value,
            error: None,
            reason: reason.into(),
        }
    }

    pub fn failed(value: T, error: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self {
            value,
            error: Some(error.to_string()),
            reason: reason.into(),
        }
    }
}

/// What the host-resident status agent says about the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthSignal {
    Healthy,
    /// The agent answered and the host has lost its workloads.
    Unhealthy,
    /// The agent could not be asked. Says nothing about the host itself.
    Unreachable,
}

impl HealthSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::Unreachable => "unreachable",
        }
    }
}

/// Aggregated storage-heartbeat evidence across repeated probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityVerdict {
    /// At least one workload wrote to its storage after the suspect window.
    Active,
    /// Enough probes agreed that nothing was written.
    Inactive,
    /// Probes failed or disagreed too often to conclude either way.
    Unknown,
}

/// What peers observed when they tried to reach the suspect host directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NeighborReport {
    /// Up peers asked to probe.
    pub probed: usize,
    /// Peers that returned an answer in time.
    pub answered: usize,
    /// Peers that reached the suspect host.
    pub reached: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    /// Some peer reached the host: a management-network-only partition.
    Reachable,
    /// Every peer answered and none reached the host.
    ConfirmedUnreachable,
    /// Not enough peers answered to say.
    Inconclusive,
}

impl NeighborReport {
    pub fn reachability(&self) -> Reachability {
        if self.reached > 0 {
            Reachability::Reachable
        } else if self.probed > 0 && self.answered == self.probed {
            Reachability::ConfirmedUnreachable
        } else {
            Reachability::Inconclusive
        }
    }
}

/// Host counts per status bucket within one cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterHealthSnapshot {
    pub counts: BTreeMap<String, usize>,
    pub total: usize,
    pub problematic: usize,
}

impl ClusterHealthSnapshot {
    pub fn from_hosts<'a>(hosts: impl IntoIterator<Item = &'a Host>) -> Self {
        let mut snapshot = Self::default();
        for host in hosts {
            snapshot.record(host.status);
        }
        snapshot
    }

    fn record(&mut self, status: HostStatus) {
        *self.counts.entry(status.as_str().to_string()).or_default() += 1;
        self.total += 1;
        if status.is_problematic() {
            self.problematic += 1;
        }
    }

    pub fn count(&self, status: HostStatus) -> usize {
        self.counts.get(status.as_str()).copied().unwrap_or(0)
    }

    /// Fraction of hosts in a problematic state; an empty cluster is 0.
    pub fn problematic_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.problematic as f64 / self.total as f64
        }
    }

    pub fn exceeds(&self, accepted_ratio: f64) -> bool {
        self.problematic_ratio() > accepted_ratio
    }
}
