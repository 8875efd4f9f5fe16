// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};

/// A filesystem type the storage daemon knows how to handle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownFilesystem {
    /// Daemon identifier (e.g. "ext4", "vfat")
    pub id: String,

    /// Human-readable name
    pub name: String,

    pub supports_unix_owners: bool,
    pub can_mount: bool,
    pub can_create: bool,

    /// Maximum label length in bytes, 0 when labels are unsupported
    pub max_label_len: u32,

    pub supports_label_rename: bool,
    pub supports_fsck: bool,
}

/// Daemon-wide properties fetched once when the pool connects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonInfo {
    pub version: String,
    pub supports_luks_devices: bool,
    pub known_filesystems: Vec<KnownFilesystem>,
}

impl DaemonInfo {
    pub fn known_filesystem(&self, id: &str) -> Option<&KnownFilesystem> {
        self.known_filesystems.iter().find(|fs| fs.id == id)
    }
}
