// SPDX-License-Identifier: GPL-3.0-only

//! Device record models
//!
//! A `DeviceRecord` is the pool's snapshot of one block device as reported by
//! the storage daemon. The optional sub-records are projections: a device that
//! is a partition carries `partition`, one that holds a partition table carries
//! `partition_table`, and so on. Several projections may be present at once.

use serde::{Deserialize, Serialize};

use crate::{JobState, PartitionInfo, PartitionTableInfo};

/// Physical drive attributes, present on devices that are whole disks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveInfo {
    pub vendor: String,
    pub model: String,
    pub revision: String,
    pub serial: String,

    /// Connection bus (e.g. "usb", "ata", "nvme")
    pub connection_interface: String,

    /// Media currently inserted (e.g. "optical_cd"), empty when unknown
    pub media: String,
    pub media_compatibility: Vec<String>,

    pub smart_capable: bool,
}

/// Membership of a device in a RAID array
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MdComponentInfo {
    /// UUID of the array this component belongs to
    pub uuid: String,
    pub name: String,
    pub level: String,
    pub num_raid_devices: u32,
}

/// Attributes of a device that is a running RAID array
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MdArrayInfo {
    pub uuid: Option<String>,
    pub level: String,
    pub num_raid_devices: u32,

    /// Ids of the component devices
    pub slaves: Vec<String>,

    pub is_degraded: bool,
    pub sync_action: String,
    pub sync_percentage: f64,
}

/// Complete snapshot of one block device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    // === Identity ===
    /// Stable daemon object id
    pub id: String,

    /// Device node (e.g. "/dev/sda1")
    pub device_file: String,

    // === Geometry ===
    /// Total size in bytes
    pub size: u64,
    pub block_size: u64,

    // === State ===
    pub is_removable: bool,
    pub is_read_only: bool,
    pub is_media_available: bool,

    /// Whether this device is presented as a drive (whole disk or array)
    pub is_drive: bool,
    pub is_mounted: bool,
    pub mount_paths: Vec<String>,

    // === Content identification ===
    /// Usage class (e.g. "filesystem", "crypto", "raid")
    pub id_usage: String,
    pub id_type: String,
    pub id_version: String,
    pub id_uuid: String,
    pub id_label: String,

    // === Projections ===
    pub partition: Option<PartitionInfo>,
    pub partition_table: Option<PartitionTableInfo>,

    /// Id of the encrypted device this cleartext device unlocks
    pub crypto_cleartext_slave: Option<String>,
    pub drive: Option<DriveInfo>,
    pub md_component: Option<MdComponentInfo>,
    pub md_array: Option<MdArrayInfo>,

    pub job: JobState,
}

impl DeviceRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn is_partition(&self) -> bool {
        self.partition.is_some()
    }

    pub fn is_partition_table(&self) -> bool {
        self.partition_table.is_some()
    }

    pub fn is_crypto_cleartext(&self) -> bool {
        self.crypto_cleartext_slave.is_some()
    }

    pub fn is_md_component(&self) -> bool {
        self.md_component.is_some()
    }

    pub fn is_md_array(&self) -> bool {
        self.md_array.is_some()
    }

    pub fn is_extended_partition(&self) -> bool {
        self.partition.as_ref().is_some_and(PartitionInfo::is_extended)
    }

    /// Id of the partition table device when this is a partition.
    pub fn partition_slave(&self) -> Option<&str> {
        self.partition.as_ref().map(|p| p.slave.as_str())
    }

    pub fn md_component_uuid(&self) -> Option<&str> {
        self.md_component
            .as_ref()
            .map(|c| c.uuid.as_str())
            .filter(|uuid| !uuid.is_empty())
    }

    pub fn md_array_uuid(&self) -> Option<&str> {
        self.md_array
            .as_ref()
            .and_then(|a| a.uuid.as_deref())
            .filter(|uuid| !uuid.is_empty())
    }

    /// Whether this array lists `id` among its components.
    pub fn md_array_references(&self, id: &str) -> bool {
        self.md_array
            .as_ref()
            .is_some_and(|a| a.slaves.iter().any(|slave| slave == id))
    }

    /// A drive and a partition are mutually exclusive projections.
    pub fn validate(&self) -> Result<(), String> {
        if self.is_drive && self.is_partition() {
            return Err("device claims to be both a drive and a partition".to_string());
        }
        Ok(())
    }

    /// Best human-facing name for the device.
    pub fn display_name(&self) -> &str {
        if !self.id_label.is_empty() {
            return &self.id_label;
        }
        if let Some(partition) = &self.partition
            && !partition.label.is_empty()
        {
            return &partition.label;
        }
        if !self.device_file.is_empty() {
            return &self.device_file;
        }
        &self.id
    }
}
