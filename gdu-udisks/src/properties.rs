// SPDX-License-Identifier: GPL-3.0-only

//! Projection of UDisks2 objects onto [`DeviceRecord`]
//!
//! Everything here is pure: it works on a snapshot of the daemon's managed
//! objects, keyed by object path and then by interface name.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use enumflags2::BitFlags;
use gdu_types::{
    DeviceRecord, DriveInfo, JobState, MdArrayInfo, MdComponentInfo, PartitionFlag,
    PartitionInfo, PartitionScheme, PartitionTableInfo,
};

use crate::error::DiskError;
use crate::values::*;

pub const BLOCK_IFACE: &str = "org.freedesktop.UDisks2.Block";
pub const PARTITION_IFACE: &str = "org.freedesktop.UDisks2.Partition";
pub const PARTITION_TABLE_IFACE: &str = "org.freedesktop.UDisks2.PartitionTable";
pub const FILESYSTEM_IFACE: &str = "org.freedesktop.UDisks2.Filesystem";
pub const DRIVE_IFACE: &str = "org.freedesktop.UDisks2.Drive";
pub const DRIVE_ATA_IFACE: &str = "org.freedesktop.UDisks2.Drive.Ata";
pub const MDRAID_IFACE: &str = "org.freedesktop.UDisks2.MDRaid";
pub const JOB_IFACE: &str = "org.freedesktop.UDisks2.Job";

/// Interfaces of one object
pub type InterfaceMap = HashMap<String, PropertyMap>;

/// Snapshot of `GetManagedObjects`
pub type ObjectMap = HashMap<String, InterfaceMap>;

/// Convert the zbus reply into plain string keys.
pub fn object_map(managed: zbus::fdo::ManagedObjects) -> ObjectMap {
    managed
        .into_iter()
        .map(|(path, interfaces)| {
            let interfaces = interfaces
                .into_iter()
                .map(|(name, props)| (name.to_string(), props))
                .collect();
            (path.to_string(), interfaces)
        })
        .collect()
}

fn interface<'a>(objects: &'a ObjectMap, path: &str, name: &str) -> Option<&'a PropertyMap> {
    objects.get(path).and_then(|interfaces| interfaces.get(name))
}

/// Build the record for block object `id`.
pub fn device_record(id: &str, objects: &ObjectMap) -> Result<DeviceRecord, DiskError> {
    let interfaces = objects
        .get(id)
        .ok_or_else(|| DiskError::DeviceNotFound(id.to_string()))?;
    let block = interfaces
        .get(BLOCK_IFACE)
        .ok_or_else(|| DiskError::MissingInterface {
            device: id.to_string(),
            interface: BLOCK_IFACE.to_string(),
        })?;

    let mut record = DeviceRecord::new(id);
    record.device_file = prop(block, "PreferredDevice", as_bytestring)
        .filter(|device| !device.is_empty())
        .or_else(|| prop(block, "Device", as_bytestring))
        .unwrap_or_default();
    record.size = prop(block, "Size", as_u64).unwrap_or(0);
    record.is_read_only = prop(block, "ReadOnly", as_bool).unwrap_or(false);
    record.id_usage = prop(block, "IdUsage", as_string).unwrap_or_default();
    record.id_type = prop(block, "IdType", as_string).unwrap_or_default();
    record.id_version = prop(block, "IdVersion", as_string).unwrap_or_default();
    record.id_uuid = prop(block, "IdUUID", as_string).unwrap_or_default();
    record.id_label = prop(block, "IdLabel", as_string).unwrap_or_default();
    record.crypto_cleartext_slave = prop(block, "CryptoBackingDevice", as_object_path);

    if let Some(fs) = interfaces.get(FILESYSTEM_IFACE) {
        record.mount_paths = fs.get("MountPoints").map(as_mount_points).unwrap_or_default();
        record.is_mounted = !record.mount_paths.is_empty();
    }

    let partition = interfaces
        .get(PARTITION_IFACE)
        .map(|props| partition_info(props, objects));
    record.partition = partition;

    if let Some(table) = interfaces.get(PARTITION_TABLE_IFACE) {
        record.partition_table = Some(partition_table_info(table, objects));
    }

    let drive_path = prop(block, "Drive", as_object_path);
    let array_path = prop(block, "MDRaid", as_object_path);
    let member_of = prop(block, "MDRaidMember", as_object_path);

    // Partitions and cleartext devices point at the drive too; only the
    // whole-disk block stands for it.
    record.is_drive = !record.is_partition()
        && !record.is_crypto_cleartext()
        && (drive_path.is_some() || array_path.is_some());

    match drive_path.as_deref().and_then(|path| interface(objects, path, DRIVE_IFACE)) {
        Some(drive) => {
            let media_removable = prop(drive, "MediaRemovable", as_bool).unwrap_or(false);
            record.is_removable =
                media_removable || prop(drive, "Removable", as_bool).unwrap_or(false);
            record.is_media_available = if media_removable {
                prop(drive, "MediaAvailable", as_bool).unwrap_or(false)
            } else {
                true
            };
            if record.is_drive {
                let ata = drive_path
                    .as_deref()
                    .and_then(|path| interface(objects, path, DRIVE_ATA_IFACE));
                record.drive = Some(drive_info(drive, ata));
            }
        }
        None => record.is_media_available = record.size > 0,
    }

    if let Some(path) = &array_path
        && let Some(array) = interface(objects, path, MDRAID_IFACE)
    {
        record.md_array = Some(md_array_info(path, array, objects));
    }

    if let Some(path) = &member_of
        && let Some(array) = interface(objects, path, MDRAID_IFACE)
    {
        record.md_component = Some(md_component_info(array));
    }

    if let Some(job) = job_for(id, objects) {
        record.job = job;
    }

    Ok(record)
}

fn partition_info(props: &PropertyMap, objects: &ObjectMap) -> PartitionInfo {
    let slave = prop(props, "Table", as_object_path).unwrap_or_default();
    let scheme = interface(objects, &slave, PARTITION_TABLE_IFACE)
        .and_then(|table| prop(table, "Type", as_string))
        .map(|kind| PartitionScheme::parse(&kind))
        .unwrap_or(PartitionScheme::Unknown(String::new()));
    let raw_flags = prop(props, "Flags", as_u64).unwrap_or(0);

    PartitionInfo {
        flags: partition_flags(&scheme, raw_flags),
        slave,
        scheme,
        number: prop(props, "Number", as_u32).unwrap_or(0),
        type_code: prop(props, "Type", as_string).unwrap_or_default(),
        label: prop(props, "Name", as_string).unwrap_or_default(),
        uuid: prop(props, "UUID", as_string).unwrap_or_default(),
        offset: prop(props, "Offset", as_u64).unwrap_or(0),
        size: prop(props, "Size", as_u64).unwrap_or(0),
    }
}

const MBR_BOOTABLE: u64 = 0x80;

/// GPT attribute bits and the flag each one carries.
const GPT_FLAG_BITS: [(u32, PartitionFlag); 5] = [
    (0, PartitionFlag::Required),
    (2, PartitionFlag::LegacyBiosBootable),
    (60, PartitionFlag::ReadOnly),
    (62, PartitionFlag::Hidden),
    (63, PartitionFlag::NoAutomount),
];

/// Decode the daemon's raw partition flags for `scheme`.
pub fn partition_flags(scheme: &PartitionScheme, raw: u64) -> BitFlags<PartitionFlag> {
    let mut flags = BitFlags::empty();
    match scheme {
        PartitionScheme::Mbr => {
            if raw & MBR_BOOTABLE != 0 {
                flags |= PartitionFlag::Bootable;
            }
        }
        PartitionScheme::Gpt => {
            for (bit, flag) in GPT_FLAG_BITS {
                if raw & (1u64 << bit) != 0 {
                    flags |= flag;
                }
            }
        }
        _ => {}
    }
    flags
}

/// Inverse of [`partition_flags`]. Flags the scheme has no bit for are dropped.
pub fn raw_partition_flags(scheme: &PartitionScheme, flags: BitFlags<PartitionFlag>) -> u64 {
    match scheme {
        PartitionScheme::Mbr if flags.contains(PartitionFlag::Bootable) => MBR_BOOTABLE,
        PartitionScheme::Gpt => GPT_FLAG_BITS
            .iter()
            .filter(|(_, flag)| flags.contains(*flag))
            .fold(0, |raw, (bit, _)| raw | (1u64 << bit)),
        _ => 0,
    }
}

fn partition_table_info(props: &PropertyMap, objects: &ObjectMap) -> PartitionTableInfo {
    let scheme = prop(props, "Type", as_string).map(|kind| PartitionScheme::parse(&kind));

    let mut entries: Vec<(u32, u64, u64)> = props
        .get("Partitions")
        .map(as_object_paths)
        .unwrap_or_default()
        .iter()
        .filter_map(|path| interface(objects, path, PARTITION_IFACE))
        .map(|part| {
            (
                prop(part, "Number", as_u32).unwrap_or(0),
                prop(part, "Offset", as_u64).unwrap_or(0),
                prop(part, "Size", as_u64).unwrap_or(0),
            )
        })
        .filter(|(number, _, _)| *number > 0)
        .collect();
    entries.sort();

    let max_number = entries.last().map(|(number, _, _)| *number).unwrap_or(0);
    let slots = max_number as usize;
    let mut offsets = vec![0; slots];
    let mut sizes = vec![0; slots];
    for (number, offset, size) in &entries {
        let slot = (*number - 1) as usize;
        offsets[slot] = *offset;
        sizes[slot] = *size;
    }

    PartitionTableInfo {
        scheme,
        count: u32::try_from(entries.len()).unwrap_or(u32::MAX),
        max_number,
        offsets,
        sizes,
    }
}

fn drive_info(drive: &PropertyMap, ata: Option<&PropertyMap>) -> DriveInfo {
    DriveInfo {
        vendor: prop(drive, "Vendor", as_string).unwrap_or_default(),
        model: prop(drive, "Model", as_string).unwrap_or_default(),
        revision: prop(drive, "Revision", as_string).unwrap_or_default(),
        serial: prop(drive, "Serial", as_string).unwrap_or_default(),
        connection_interface: prop(drive, "ConnectionBus", as_string).unwrap_or_default(),
        media: prop(drive, "Media", as_string).unwrap_or_default(),
        media_compatibility: prop(drive, "MediaCompatibility", as_strings).unwrap_or_default(),
        smart_capable: ata
            .and_then(|ata| prop(ata, "SmartSupported", as_bool))
            .unwrap_or(false),
    }
}

fn md_component_info(array: &PropertyMap) -> MdComponentInfo {
    MdComponentInfo {
        uuid: prop(array, "UUID", as_string).unwrap_or_default(),
        name: prop(array, "Name", as_string).unwrap_or_default(),
        level: prop(array, "Level", as_string).unwrap_or_default(),
        num_raid_devices: prop(array, "NumDevices", as_u32).unwrap_or(0),
    }
}

/// The array's components are the blocks whose `MDRaidMember` names it.
fn md_array_info(path: &str, array: &PropertyMap, objects: &ObjectMap) -> MdArrayInfo {
    let mut slaves: Vec<String> = objects
        .iter()
        .filter(|(_, interfaces)| {
            interfaces
                .get(BLOCK_IFACE)
                .and_then(|block| prop(block, "MDRaidMember", as_object_path))
                .is_some_and(|member_of| member_of == path)
        })
        .map(|(slave, _)| slave.clone())
        .collect();
    slaves.sort();

    MdArrayInfo {
        uuid: prop(array, "UUID", as_string).filter(|uuid| !uuid.is_empty()),
        level: prop(array, "Level", as_string).unwrap_or_default(),
        num_raid_devices: prop(array, "NumDevices", as_u32).unwrap_or(0),
        slaves,
        is_degraded: prop(array, "Degraded", as_u32).unwrap_or(0) > 0,
        sync_action: prop(array, "SyncAction", as_string).unwrap_or_default(),
        sync_percentage: prop(array, "SyncCompleted", as_f64).unwrap_or(0.0) * 100.0,
    }
}

/// Job state from a Job object's properties.
pub fn job_state(props: &PropertyMap) -> JobState {
    let operation = prop(props, "Operation", as_string).unwrap_or_default();
    let progress = prop(props, "ProgressValid", as_bool)
        .unwrap_or(false)
        .then(|| prop(props, "Progress", as_f64))
        .flatten()
        .map(|fraction| fraction * 100.0)
        .unwrap_or(-1.0);
    let started_at = prop(props, "StartTime", as_u64)
        .and_then(|usec| i64::try_from(usec).ok())
        .and_then(DateTime::<Utc>::from_timestamp_micros);

    JobState {
        in_progress: true,
        id: operation.clone(),
        initiated_by_uid: prop(props, "StartedByUID", as_u32).unwrap_or(0),
        is_cancellable: prop(props, "Cancelable", as_bool).unwrap_or(false),
        num_tasks: 1,
        cur_task: 0,
        cur_task_id: operation,
        cur_task_percentage: progress,
        started_at,
    }
}

/// Objects a Job object covers.
pub fn job_objects(props: &PropertyMap) -> Vec<String> {
    props.get("Objects").map(as_object_paths).unwrap_or_default()
}

/// The job running on `id`, if any.
fn job_for(id: &str, objects: &ObjectMap) -> Option<JobState> {
    objects
        .values()
        .filter_map(|interfaces| interfaces.get(JOB_IFACE))
        .find(|job| job_objects(job).iter().any(|object| object == id))
        .map(job_state)
}

/// The block device of a running array.
pub fn array_block(array: &str, objects: &ObjectMap) -> Option<String> {
    objects
        .iter()
        .filter(|(_, interfaces)| {
            interfaces
                .get(BLOCK_IFACE)
                .and_then(|block| prop(block, "MDRaid", as_object_path))
                .is_some_and(|owner| owner == array)
        })
        .map(|(path, _)| path.clone())
        .min()
}

/// Block objects whose record depends on object `path`: the block itself, the
/// blocks of a drive, the blocks of an array and its members, and the
/// partitions of a table.
pub fn dependent_blocks(path: &str, objects: &ObjectMap) -> Vec<String> {
    let mut blocks: Vec<String> = objects
        .iter()
        .filter_map(|(block_path, interfaces)| {
            let block = interfaces.get(BLOCK_IFACE)?;
            let related = block_path == path
                || ["Drive", "MDRaid", "MDRaidMember", "CryptoBackingDevice"]
                    .iter()
                    .any(|name| prop(block, name, as_object_path).as_deref() == Some(path))
                || interfaces
                    .get(PARTITION_IFACE)
                    .and_then(|part| prop(part, "Table", as_object_path))
                    .is_some_and(|table| table == path);
            related.then(|| block_path.clone())
        })
        .collect();
    blocks.sort();
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::test_values::*;

    const SDA: &str = "/org/freedesktop/UDisks2/block_devices/sda";
    const SDA1: &str = "/org/freedesktop/UDisks2/block_devices/sda1";
    const SDA2: &str = "/org/freedesktop/UDisks2/block_devices/sda2";
    const SDB: &str = "/org/freedesktop/UDisks2/block_devices/sdb";
    const MD0: &str = "/org/freedesktop/UDisks2/block_devices/md0";
    const DISK: &str = "/org/freedesktop/UDisks2/drives/ACME_Spinner";
    const RAID: &str = "/org/freedesktop/UDisks2/mdraid/uuid_4b3c";
    const JOB: &str = "/org/freedesktop/UDisks2/jobs/7";

    fn props(entries: Vec<(&str, zbus::zvariant::OwnedValue)>) -> PropertyMap {
        entries
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }

    fn block(
        device: &str,
        size: u64,
        extra: Vec<(&str, zbus::zvariant::OwnedValue)>,
    ) -> PropertyMap {
        let mut map = props(vec![
            ("Device", bytestring(device)),
            ("PreferredDevice", bytestring(device)),
            ("Size", owned(size)),
            ("ReadOnly", owned(false)),
            ("Drive", path("/")),
            ("MDRaid", path("/")),
            ("MDRaidMember", path("/")),
            ("CryptoBackingDevice", path("/")),
            ("IdUsage", owned("")),
            ("IdType", owned("")),
            ("IdLabel", owned("")),
            ("IdUUID", owned("")),
        ]);
        map.extend(props(extra));
        map
    }

    fn object(interfaces: Vec<(&str, PropertyMap)>) -> InterfaceMap {
        interfaces
            .into_iter()
            .map(|(name, props)| (name.to_string(), props))
            .collect()
    }

    fn sample() -> ObjectMap {
        let mut objects = ObjectMap::new();
        objects.insert(
            DISK.to_string(),
            object(vec![
                (
                    DRIVE_IFACE,
                    props(vec![
                        ("Vendor", owned("ACME")),
                        ("Model", owned("Spinner 9000")),
                        ("Serial", owned("S3R1AL")),
                        ("ConnectionBus", owned("")),
                        ("MediaRemovable", owned(false)),
                        ("Removable", owned(false)),
                    ]),
                ),
                (DRIVE_ATA_IFACE, props(vec![("SmartSupported", owned(true))])),
            ]),
        );
        objects.insert(
            SDA.to_string(),
            object(vec![
                (BLOCK_IFACE, block("/dev/sda", 1000, vec![("Drive", path(DISK))])),
                (
                    PARTITION_TABLE_IFACE,
                    props(vec![("Type", owned("dos")), ("Partitions", paths(&[SDA2, SDA1]))]),
                ),
            ]),
        );
        objects.insert(
            SDA1.to_string(),
            object(vec![
                (
                    BLOCK_IFACE,
                    block(
                        "/dev/sda1",
                        100,
                        vec![
                            ("Drive", path(DISK)),
                            ("IdUsage", owned("filesystem")),
                            ("IdLabel", owned("data")),
                        ],
                    ),
                ),
                (
                    PARTITION_IFACE,
                    props(vec![
                        ("Number", owned(1_u32)),
                        ("Type", owned("0x83")),
                        ("Offset", owned(100_u64)),
                        ("Size", owned(100_u64)),
                        ("Flags", owned(0x80_u64)),
                        ("Name", owned("")),
                        ("UUID", owned("abcd-01")),
                        ("Table", path(SDA)),
                    ]),
                ),
                (
                    FILESYSTEM_IFACE,
                    props(vec![("MountPoints", owned(vec![b"/mnt/data\0".to_vec()]))]),
                ),
            ]),
        );
        objects.insert(
            SDA2.to_string(),
            object(vec![
                (BLOCK_IFACE, block("/dev/sda2", 600, vec![("Drive", path(DISK))])),
                (
                    PARTITION_IFACE,
                    props(vec![
                        ("Number", owned(3_u32)),
                        ("Type", owned("0x05")),
                        ("Offset", owned(300_u64)),
                        ("Size", owned(600_u64)),
                        ("Table", path(SDA)),
                    ]),
                ),
            ]),
        );
        objects.insert(
            RAID.to_string(),
            object(vec![(
                MDRAID_IFACE,
                props(vec![
                    ("UUID", owned("4b3c1a2e:91f0aa10")),
                    ("Name", owned("box:0")),
                    ("Level", owned("raid1")),
                    ("NumDevices", owned(2_u32)),
                    ("Degraded", owned(1_u32)),
                    ("SyncAction", owned("idle")),
                    ("SyncCompleted", owned(0.5_f64)),
                ]),
            )]),
        );
        objects.insert(
            SDB.to_string(),
            object(vec![(
                BLOCK_IFACE,
                block(
                    "/dev/sdb",
                    2000,
                    vec![("MDRaidMember", path(RAID)), ("IdUsage", owned("raid"))],
                ),
            )]),
        );
        objects.insert(
            MD0.to_string(),
            object(vec![(BLOCK_IFACE, block("/dev/md0", 2000, vec![("MDRaid", path(RAID))]))]),
        );
        objects.insert(
            JOB.to_string(),
            object(vec![(
                JOB_IFACE,
                props(vec![
                    ("Operation", owned("filesystem-mount")),
                    ("Progress", owned(0.25_f64)),
                    ("ProgressValid", owned(true)),
                    ("Cancelable", owned(true)),
                    ("StartedByUID", owned(1000_u32)),
                    ("StartTime", owned(1_700_000_000_000_000_u64)),
                    ("Objects", paths(&[SDA1])),
                ]),
            )]),
        );
        objects
    }

    #[test]
    fn whole_disk_block_is_the_drive() {
        let record = device_record(SDA, &sample()).expect("sda parses");
        assert!(record.is_drive);
        assert!(record.is_media_available);
        assert_eq!(record.device_file, "/dev/sda");
        let drive = record.drive.expect("drive info");
        assert_eq!(drive.vendor, "ACME");
        assert!(drive.smart_capable);

        let table = record.partition_table.expect("table");
        assert_eq!(table.scheme, Some(PartitionScheme::Mbr));
        assert_eq!(table.count, 2);
        assert_eq!(table.max_number, 3);
        assert_eq!(table.offsets, vec![100, 0, 300]);
        assert_eq!(table.sizes, vec![100, 0, 600]);
    }

    #[test]
    fn partition_points_at_its_table() {
        let record = device_record(SDA1, &sample()).expect("sda1 parses");
        assert!(!record.is_drive);
        assert!(record.drive.is_none());
        let partition = record.partition.expect("partition info");
        assert_eq!(partition.slave, SDA);
        assert_eq!(partition.scheme, PartitionScheme::Mbr);
        assert_eq!(partition.flags, BitFlags::from(PartitionFlag::Bootable));
        assert_eq!(record.mount_paths, vec!["/mnt/data"]);
        assert!(record.is_mounted);
        assert_eq!(record.id_label, "data");

        assert!(record.job.in_progress);
        assert_eq!(record.job.id, "filesystem-mount");
        assert_eq!(record.job.cur_task_percentage, 25.0);
        assert_eq!(record.job.initiated_by_uid, 1000);
        assert!(record.job.started_at.is_some());
    }

    #[test]
    fn extended_partition_is_detected_from_type() {
        let record = device_record(SDA2, &sample()).expect("sda2 parses");
        assert!(record.is_extended_partition());
        assert!(!record.job.in_progress);
    }

    #[test]
    fn array_and_member_share_raid_uuid() {
        let objects = sample();
        let array = device_record(MD0, &objects).expect("md0 parses");
        let member = device_record(SDB, &objects).expect("sdb parses");

        assert!(array.is_drive);
        let info = array.md_array.expect("array info");
        assert_eq!(info.slaves, vec![SDB.to_string()]);
        assert!(info.is_degraded);
        assert_eq!(info.sync_percentage, 50.0);

        assert!(!member.is_drive);
        assert_eq!(member.md_component_uuid(), array.md_array_uuid());
        assert!(member.md_component_uuid().is_some());
    }

    #[test]
    fn missing_objects_are_reported() {
        let objects = sample();
        assert!(matches!(
            device_record("/org/freedesktop/UDisks2/block_devices/sdz", &objects),
            Err(DiskError::DeviceNotFound(_))
        ));
        assert!(matches!(
            device_record(DISK, &objects),
            Err(DiskError::MissingInterface { .. })
        ));
    }

    #[test]
    fn gpt_flags_decode_by_bit() {
        let flags = partition_flags(&PartitionScheme::Gpt, 1 | (1 << 63));
        assert!(flags.contains(PartitionFlag::Required));
        assert!(flags.contains(PartitionFlag::NoAutomount));
        assert!(!flags.contains(PartitionFlag::Hidden));
        assert!(partition_flags(&PartitionScheme::Mbr, 1).is_empty());
    }

    #[test]
    fn flags_encode_per_scheme() {
        let flags = PartitionFlag::Hidden | PartitionFlag::Bootable;
        assert_eq!(raw_partition_flags(&PartitionScheme::Gpt, flags), 1 << 62);
        assert_eq!(raw_partition_flags(&PartitionScheme::Mbr, flags), 0x80);
        assert_eq!(raw_partition_flags(&PartitionScheme::Apm, flags), 0);

        let raw: u64 = (1 << 2) | (1 << 60);
        let decoded = partition_flags(&PartitionScheme::Gpt, raw);
        assert_eq!(raw_partition_flags(&PartitionScheme::Gpt, decoded), raw);
    }

    #[test]
    fn dependents_of_drive_and_array() {
        let objects = sample();
        assert_eq!(dependent_blocks(DISK, &objects), vec![SDA, SDA1, SDA2]);
        assert_eq!(dependent_blocks(RAID, &objects), vec![MD0, SDB]);
        assert_eq!(dependent_blocks(SDA, &objects), vec![SDA, SDA1, SDA2]);
    }

    #[test]
    fn running_array_resolves_to_its_block() {
        let mut objects = sample();
        assert_eq!(array_block(RAID, &objects).as_deref(), Some(MD0));
        assert_eq!(array_block(DISK, &objects), None);

        objects.remove(MD0);
        assert_eq!(array_block(RAID, &objects), None);
    }
}
