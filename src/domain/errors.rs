//! Error types for the HA subsystem.
//!
//! Every variant here is recoverable: callers map them to a less destructive
//! verdict or a failed action, never to a process-level failure.

use std::time::Duration;
use thiserror::Error;

use super::models::{HostId, PoolId};

/// Errors surfaced by collaborator ports (membership, run-state, volumes).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PortError {
    #[error("Host not found: {0}")]
    HostNotFound(HostId),

    #[error("Storage pool not found: {0}")]
    PoolNotFound(PoolId),

    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the host-resident status agent probe.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("Status agent is disabled")]
    Disabled,

    #[error("Status agent request failed: {0}")]
    Request(String),

    #[error("Status agent did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Status agent returned HTTP {0}")]
    Status(u16),

    #[error("Status agent returned a malformed body: {0}")]
    Malformed(String),
}

impl AgentError {
    /// Transport-level failures are worth the single retry; a disabled agent is not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

/// Errors from the peer request/response channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PeerError {
    #[error("Peer {0} is unreachable")]
    Unreachable(HostId),

    #[error("Peer {0} did not answer in time")]
    Timeout(HostId),

    #[error("Peer {peer} cannot access storage pool {pool}")]
    StorageUnavailable { peer: HostId, pool: PoolId },

    #[error("Peer {peer} rejected the command: {reason}")]
    Rejected { peer: HostId, reason: String },

    #[error("Peer {0} sent an answer that does not match the command")]
    UnexpectedAnswer(HostId),
}

impl PeerError {
    /// Whether another peer may succeed where this one failed.
    pub fn try_next_peer(&self) -> bool {
        !matches!(self, Self::StorageUnavailable { .. })
    }
}

/// Reasons a storage-activity probe is inconclusive.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActivityError {
    #[error("No shared-storage workloads to take heartbeat evidence from")]
    NoEvidence,

    #[error("No responsive peer for storage pool {0}")]
    NoResponsivePeer(PoolId),

    #[error("Storage pool {0} is unavailable")]
    StorageUnavailable(PoolId),

    #[error("Activity probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("Collaborator lookup failed: {0}")]
    Lookup(#[from] PortError),
}

/// Errors from out-of-band power management.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OobmError {
    #[error("Out-of-band management is not configured for host {0}")]
    NotConfigured(HostId),

    #[error("Out-of-band operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Out-of-band operation failed: {0}")]
    Operation(String),

    #[error("Host {host} still reports power state {state} after fencing")]
    StillPowered { host: HostId, state: String },
}

pub type PortResult<T> = Result<T, PortError>;
