// SPDX-License-Identifier: GPL-3.0-only

//! Daemon-wide properties: version, filesystems, encryption support

use gdu_types::{DaemonInfo, KnownFilesystem};
use tracing::debug;
use zbus::Connection;

use crate::error::DiskError;
use crate::manager::UDisks2ManagerProxy;

/// What the daemon cannot tell us about a filesystem type:
/// `(id, name, supports_unix_owners, max_label_len, supports_label_rename)`.
const FILESYSTEM_TRAITS: &[(&str, &str, bool, u32, bool)] = &[
    ("ext2", "Ext2", true, 16, true),
    ("ext3", "Ext3", true, 16, true),
    ("ext4", "Ext4", true, 16, true),
    ("xfs", "XFS", true, 12, true),
    ("btrfs", "Btrfs", true, 255, true),
    ("f2fs", "F2FS", true, 512, false),
    ("nilfs2", "NILFS2", true, 80, true),
    ("udf", "UDF", true, 126, true),
    ("vfat", "FAT", false, 11, true),
    ("exfat", "exFAT", false, 15, true),
    ("ntfs", "NTFS", false, 128, true),
    ("swap", "Swap", false, 15, true),
];

/// Describe filesystem `id` given what the daemon reports it can do.
pub fn known_filesystem(id: &str, can_create: bool, can_check: bool) -> KnownFilesystem {
    let traits = FILESYSTEM_TRAITS.iter().find(|(known, ..)| *known == id);
    let (name, supports_unix_owners, max_label_len, supports_label_rename) = traits
        .map(|(_, name, owners, len, rename)| (name.to_string(), *owners, *len, *rename))
        .unwrap_or_else(|| (id.to_string(), false, 0, false));

    KnownFilesystem {
        id: id.to_string(),
        name,
        supports_unix_owners,
        can_mount: id != "swap",
        can_create,
        max_label_len,
        supports_label_rename,
        supports_fsck: can_check,
    }
}

pub fn supports_luks(encryption_types: &[String]) -> bool {
    encryption_types
        .iter()
        .any(|kind| kind == "luks1" || kind == "luks2")
}

pub async fn read_daemon_info(connection: &Connection) -> Result<DaemonInfo, DiskError> {
    let manager = UDisks2ManagerProxy::new(connection).await?;
    let version = manager.version().await?;
    let filesystems = manager.supported_filesystems().await?;
    let encryption = manager.supported_encryption_types().await.unwrap_or_default();

    let mut known_filesystems = Vec::with_capacity(filesystems.len());
    for id in filesystems {
        let (can_create, _) = manager.can_format(&id).await.unwrap_or((false, String::new()));
        let (can_check, _) = manager.can_check(&id).await.unwrap_or((false, String::new()));
        known_filesystems.push(known_filesystem(&id, can_create, can_check));
    }
    debug!(version = %version, filesystems = known_filesystems.len(), "Read daemon properties");

    Ok(DaemonInfo {
        version,
        supports_luks_devices: supports_luks(&encryption),
        known_filesystems,
    })
}
