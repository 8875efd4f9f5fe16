// SPDX-License-Identifier: GPL-3.0-only

//! Mutation requests routed through the pool to the storage daemon

use std::fmt;

use enumflags2::BitFlags;
use serde::{Deserialize, Serialize};

use crate::{PartitionFlag, PartitionScheme};

/// A passphrase or other secret. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// SMART self-test kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmartSelfTestKind {
    /// Short self-test (usually a few minutes)
    Short,
    /// Extended self-test (can take hours for large drives)
    Extended,
    Conveyance,
}

impl SmartSelfTestKind {
    /// Convert to UDisks2 string representation
    pub fn as_udisks_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Extended => "extended",
            Self::Conveyance => "conveyance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "short" => Some(Self::Short),
            "extended" | "long" => Some(Self::Extended),
            "conveyance" => Some(Self::Conveyance),
            _ => None,
        }
    }
}

/// A request to mutate a device. Every `device` field is a device id.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    FilesystemCreate {
        device: String,
        fstype: String,
        label: Option<String>,
        erase: bool,
        /// Encrypt the new filesystem with this passphrase
        passphrase: Option<Secret>,
    },
    FilesystemSetLabel {
        device: String,
        label: String,
    },
    Mount {
        device: String,
        options: Option<String>,
    },
    Unmount {
        device: String,
        force: bool,
    },
    PartitionCreate {
        /// Device carrying the partition table
        device: String,
        offset: u64,
        size: u64,
        type_code: String,
        name: String,
    },
    PartitionDelete {
        device: String,
    },
    PartitionModify {
        device: String,
        type_code: Option<String>,
        label: Option<String>,
        flags: Option<BitFlags<PartitionFlag>>,
    },
    TableCreate {
        device: String,
        scheme: PartitionScheme,
        erase: bool,
    },
    EncryptedUnlock {
        device: String,
        passphrase: Secret,
    },
    EncryptedLock {
        device: String,
    },
    EncryptedChangePassphrase {
        device: String,
        old: Secret,
        new: Secret,
    },
    MdStart {
        components: Vec<String>,
    },
    MdStop {
        device: String,
    },
    MdAddComponent {
        device: String,
        component: String,
    },
    MdRemoveComponent {
        device: String,
        component: String,
    },
    CancelJob {
        device: String,
    },
    SmartRefresh {
        device: String,
    },
    SmartSelftest {
        device: String,
        kind: SmartSelfTestKind,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FilesystemCreate { .. } => "filesystem-create",
            Self::FilesystemSetLabel { .. } => "filesystem-set-label",
            Self::Mount { .. } => "mount",
            Self::Unmount { .. } => "unmount",
            Self::PartitionCreate { .. } => "partition-create",
            Self::PartitionDelete { .. } => "partition-delete",
            Self::PartitionModify { .. } => "partition-modify",
            Self::TableCreate { .. } => "table-create",
            Self::EncryptedUnlock { .. } => "encrypted-unlock",
            Self::EncryptedLock { .. } => "encrypted-lock",
            Self::EncryptedChangePassphrase { .. } => "encrypted-change-passphrase",
            Self::MdStart { .. } => "md-start",
            Self::MdStop { .. } => "md-stop",
            Self::MdAddComponent { .. } => "md-add-component",
            Self::MdRemoveComponent { .. } => "md-remove-component",
            Self::CancelJob { .. } => "cancel-job",
            Self::SmartRefresh { .. } => "smart-refresh",
            Self::SmartSelftest { .. } => "smart-selftest",
        }
    }

    /// Every device id the request acts on.
    pub fn devices(&self) -> Vec<&str> {
        match self {
            Self::MdStart { components } => components.iter().map(String::as_str).collect(),
            Self::MdAddComponent { device, component }
            | Self::MdRemoveComponent { device, component } => {
                vec![device.as_str(), component.as_str()]
            }
            Self::FilesystemCreate { device, .. }
            | Self::FilesystemSetLabel { device, .. }
            | Self::Mount { device, .. }
            | Self::Unmount { device, .. }
            | Self::PartitionCreate { device, .. }
            | Self::PartitionDelete { device }
            | Self::PartitionModify { device, .. }
            | Self::TableCreate { device, .. }
            | Self::EncryptedUnlock { device, .. }
            | Self::EncryptedLock { device }
            | Self::EncryptedChangePassphrase { device, .. }
            | Self::MdStop { device }
            | Self::CancelJob { device }
            | Self::SmartRefresh { device }
            | Self::SmartSelftest { device, .. } => vec![device.as_str()],
        }
    }
}

/// What a completed operation produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationOutput {
    Done,
    /// Where the filesystem was mounted
    MountPath(String),
    /// Id of the partition that was created
    CreatedDevice(String),
    /// Id of the unlocked cleartext device
    CleartextDevice(String),
    /// Device id of the block the assembled array runs as
    AssembledArray(String),
}
