//! Hypervisor kinds and their HA capabilities.
//!
//! Each hypervisor kind is a variant rather than a provider implementation;
//! supporting a new hypervisor means adding a variant and its capability row.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypervisorKind {
    #[default]
    Kvm,
    Simulator,
    Vmware,
    XenServer,
    HyperV,
}

/// What the HA subsystem can do for hosts of a given hypervisor kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaCapability {
    /// Host-resident status agent answering workload counts.
    pub local_agent: bool,
    /// Peers can inspect shared storage for heartbeat evidence.
    pub storage_heartbeat: bool,
    /// Recovery and fencing go through out-of-band management.
    pub oobm_fencing: bool,
}

impl HaCapability {
    pub const NONE: Self = Self {
        local_agent: false,
        storage_heartbeat: false,
        oobm_fencing: false,
    };

    /// A host is eligible for HA only if it can be both checked and fenced.
    pub fn is_eligible(&self) -> bool {
        self.storage_heartbeat && self.oobm_fencing
    }
}

impl HypervisorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kvm => "kvm",
            Self::Simulator => "simulator",
            Self::Vmware => "vmware",
            Self::XenServer => "xenserver",
            Self::HyperV => "hyperv",
        }
    }

    pub fn ha_capability(&self) -> HaCapability {
        match self {
            Self::Kvm | Self::Simulator => HaCapability {
                local_agent: true,
                storage_heartbeat: true,
                oobm_fencing: true,
            },
            // These hypervisors run their own HA inside the vendor stack.
            Self::Vmware | Self::XenServer | Self::HyperV => HaCapability::NONE,
        }
    }
}

impl fmt::Display for HypervisorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
