// SPDX-License-Identifier: GPL-3.0-only

//! Partition and partition table models

use enumflags2::{BitFlags, bitflags};
use serde::{Deserialize, Serialize};

use crate::ByteRange;

/// MBR type codes that mark an extended partition container.
const EXTENDED_TYPE_CODES: [u32; 3] = [0x05, 0x0f, 0x85];

/// Number of primary slots in an MBR table. Entries numbered above this are logical.
pub const MBR_PRIMARY_SLOTS: u32 = 4;

/// Partitioning scheme of a table, or of the table a partition lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionScheme {
    /// Master Boot Record (reported as `mbr` or `dos`)
    Mbr,
    /// GUID Partition Table
    Gpt,
    /// Apple Partition Map
    Apm,
    /// Anything else the daemon reports, kept verbatim
    Unknown(String),
}

impl PartitionScheme {
    pub fn parse(value: &str) -> Self {
        match value {
            "mbr" | "dos" => Self::Mbr,
            "gpt" => Self::Gpt,
            "apm" | "mac" => Self::Apm,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Mbr => "mbr",
            Self::Gpt => "gpt",
            Self::Apm => "apm",
            Self::Unknown(other) => other,
        }
    }
}

/// User-toggleable partition attributes.
#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PartitionFlag {
    /// MBR active/boot flag
    Bootable = 1 << 0,
    /// GPT "required partition" (system partition)
    Required = 1 << 1,
    LegacyBiosBootable = 1 << 2,
    Hidden = 1 << 3,
    ReadOnly = 1 << 4,
    NoAutomount = 1 << 5,
}

/// Projection of a device that is an entry of a partition table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    /// Id of the device carrying the partition table
    pub slave: String,

    /// Scheme of the enclosing table
    pub scheme: PartitionScheme,

    /// 1-based entry number
    pub number: u32,

    /// Type code: a hex byte such as `0x83` for MBR, a GUID for GPT
    pub type_code: String,

    pub label: String,
    pub uuid: String,
    pub flags: BitFlags<PartitionFlag>,

    /// Byte offset from the start of the slave device
    pub offset: u64,

    /// Size in bytes
    pub size: u64,
}

impl PartitionInfo {
    pub fn range(&self) -> ByteRange {
        ByteRange::from_offset(self.offset, self.size)
    }

    /// An MBR entry numbered above the four primary slots.
    pub fn is_logical(&self) -> bool {
        self.scheme == PartitionScheme::Mbr && self.number > MBR_PRIMARY_SLOTS
    }

    /// An MBR container partition (type 0x05, 0x0f or 0x85).
    pub fn is_extended(&self) -> bool {
        self.scheme == PartitionScheme::Mbr
            && parse_type_code(&self.type_code).is_some_and(|code| EXTENDED_TYPE_CODES.contains(&code))
    }
}

/// One occupied slot of a partition table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionEntry {
    /// 1-based entry number (slot index + 1)
    pub number: u32,
    pub offset: u64,
    pub size: u64,
}

impl PartitionEntry {
    pub fn range(&self) -> ByteRange {
        ByteRange::from_offset(self.offset, self.size)
    }
}

/// Projection of a device that carries a partition table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionTableInfo {
    pub scheme: Option<PartitionScheme>,

    /// Number of partitions currently present
    pub count: u32,

    /// Number of entry slots, the length of `offsets` and `sizes`
    pub max_number: u32,

    /// Entry offsets indexed by slot. An offset of 0 marks an unused slot.
    pub offsets: Vec<u64>,

    /// Entry sizes indexed by slot
    pub sizes: Vec<u64>,
}

impl PartitionTableInfo {
    pub fn is_mbr(&self) -> bool {
        self.scheme == Some(PartitionScheme::Mbr)
    }

    /// Occupied slots in slot order. Slots missing from either array are skipped.
    pub fn entries(&self) -> impl Iterator<Item = PartitionEntry> + '_ {
        self.offsets
            .iter()
            .zip(self.sizes.iter())
            .enumerate()
            .filter(|(_, (offset, _))| **offset != 0)
            .map(|(slot, (offset, size))| PartitionEntry {
                number: u32::try_from(slot + 1).unwrap_or(u32::MAX),
                offset: *offset,
                size: *size,
            })
    }
}

/// Parse a partition type code the way C `strtol(code, NULL, 0)` would:
/// `0x` prefix for hex, a leading `0` for octal, decimal otherwise.
///
/// Parsing stops at the first character that is not a digit of the detected
/// base. Returns `None` when no digit could be read at all.
pub fn parse_type_code(code: &str) -> Option<u32> {
    let trimmed = code.trim_start();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let (radix, digits) = if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
        && hex.chars().next().is_some_and(|c| c.is_ascii_hexdigit())
    {
        (16, hex)
    } else if unsigned.starts_with('0') {
        (8, unsigned)
    } else {
        (10, unsigned)
    };

    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_digit(radix))
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let value = u32::from_str_radix(&digits[..end], radix).ok()?;
    if negative {
        // Negative codes never name a real partition type.
        return None;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mbr_partition(number: u32, type_code: &str) -> PartitionInfo {
        PartitionInfo {
            slave: "sda".to_string(),
            scheme: PartitionScheme::Mbr,
            number,
            type_code: type_code.to_string(),
            label: String::new(),
            uuid: String::new(),
            flags: BitFlags::empty(),
            offset: 0,
            size: 0,
        }
    }

    #[test]
    fn type_codes_follow_strtol_base_detection() {
        assert_eq!(parse_type_code("0x05"), Some(5));
        assert_eq!(parse_type_code("0X0F"), Some(15));
        assert_eq!(parse_type_code("0x85"), Some(0x85));
        assert_eq!(parse_type_code("133"), Some(133));
        assert_eq!(parse_type_code("017"), Some(15));
        assert_eq!(parse_type_code("  0x83 trailing"), Some(0x83));
        assert_eq!(parse_type_code("0"), Some(0));
        assert_eq!(parse_type_code(""), None);
        assert_eq!(parse_type_code("linux"), None);
        // GPT GUIDs start with hex digits that are not octal.
        assert_eq!(
            parse_type_code("0fc63daf-8483-4772-8e79-3d69d8477de4"),
            Some(0)
        );
    }

    #[test]
    fn extended_and_logical_classification() {
        assert!(mbr_partition(2, "0x05").is_extended());
        assert!(mbr_partition(2, "0x0f").is_extended());
        assert!(mbr_partition(3, "0x85").is_extended());
        assert!(!mbr_partition(1, "0x83").is_extended());
        assert!(!mbr_partition(5, "0x83").is_extended());

        assert!(mbr_partition(5, "0x83").is_logical());
        assert!(!mbr_partition(4, "0x83").is_logical());

        let mut gpt = mbr_partition(7, "0x05");
        gpt.scheme = PartitionScheme::Gpt;
        assert!(!gpt.is_extended());
        assert!(!gpt.is_logical());
    }

    #[test]
    fn scheme_accepts_dos_alias() {
        assert_eq!(PartitionScheme::parse("dos"), PartitionScheme::Mbr);
        assert_eq!(PartitionScheme::parse("mbr"), PartitionScheme::Mbr);
        assert_eq!(PartitionScheme::parse("gpt").as_str(), "gpt");
        assert_eq!(
            PartitionScheme::parse("sun"),
            PartitionScheme::Unknown("sun".to_string())
        );
    }

    #[test]
    fn table_entries_skip_unused_and_unpaired_slots() {
        let table = PartitionTableInfo {
            scheme: Some(PartitionScheme::Mbr),
            count: 2,
            max_number: 4,
            offsets: vec![10, 0, 40, 90],
            sizes: vec![20, 5, 30],
        };

        let entries: Vec<_> = table.entries().collect();
        assert_eq!(
            entries,
            vec![
                PartitionEntry {
                    number: 1,
                    offset: 10,
                    size: 20
                },
                PartitionEntry {
                    number: 3,
                    offset: 40,
                    size: 30
                },
            ]
        );
    }
}
