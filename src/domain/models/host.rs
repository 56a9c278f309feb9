//! Host and cluster identity models.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::hypervisor::HypervisorKind;

/// Identifier of a monitored compute host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(pub String);

impl HostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a cluster (the scope for configuration and peer selection).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(pub String);

impl ClusterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a host as observed by the management plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostStatus {
    Up,
    Disconnected,
    Down,
    Alert,
    Error,
    Unknown,
}

impl HostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Disconnected => "disconnected",
            Self::Down => "down",
            Self::Alert => "alert",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }

    /// Every status other than `Up` counts against the cluster health gate.
    pub fn is_problematic(&self) -> bool {
        !matches!(self, Self::Up)
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A monitored compute node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,
    pub cluster_id: ClusterId,
    #[serde(default)]
    pub hypervisor: HypervisorKind,
    /// Address the local status agent listens on (IP or hostname).
    pub address: String,
    pub status: HostStatus,
    /// Whether out-of-band power control is configured for this host.
    #[serde(default)]
    pub oobm_enabled: bool,
}

impl Host {
    pub fn is_up(&self) -> bool {
        self.status == HostStatus::Up
    }

    /// True when `other` is a different host in the same cluster.
    pub fn is_peer_of(&self, other: &Host) -> bool {
        self.id != other.id && self.cluster_id == other.cluster_id
    }
}
