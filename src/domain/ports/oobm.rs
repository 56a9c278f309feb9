//! Out-of-band management port - power control independent of the host OS.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::OobmError;
use crate::domain::models::Host;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    On,
    Off,
    Unknown,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Each operation can fail independently of the host's network status.
#[async_trait]
pub trait OutOfBandManagement: Send + Sync {
    async fn reset(&self, host: &Host) -> Result<(), OobmError>;

    async fn power_off(&self, host: &Host) -> Result<(), OobmError>;

    async fn power_state(&self, host: &Host) -> Result<PowerState, OobmError>;
}
