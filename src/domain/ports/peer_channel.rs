//! Peer RPC port - ask another host in the cluster to check on our behalf.
//!
//! Modelled as request/response messages so peer selection and fallback can be
//! exercised against fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::PeerError;
use crate::domain::models::{Host, HostId, PoolId, SuspectWindow, WorkloadRef};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PeerCommand {
    /// Inspect `pool` for writes by `suspect`'s workloads after `since`.
    CheckActivity {
        suspect: HostId,
        pool: PoolId,
        workloads: Vec<WorkloadRef>,
        since: SuspectWindow,
    },
    /// Try to reach `suspect` directly at `address`.
    CheckReachability { suspect: HostId, address: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "answer", content = "value", rename_all = "snake_case")]
pub enum PeerAnswer {
    Activity(bool),
    Reachable(bool),
}

#[async_trait]
pub trait PeerChannel: Send + Sync {
    /// Send a command to `peer` and wait for its answer.
    async fn send(&self, peer: &Host, command: PeerCommand) -> Result<PeerAnswer, PeerError>;
}
