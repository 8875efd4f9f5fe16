// SPDX-License-Identifier: GPL-3.0-only

//! User-facing entities derived from device records
//!
//! Presentables never hold references to each other or to records; they name
//! their enclosing presentable and their backing device by id, so any of them
//! can vanish without leaving dangling pointers behind.

use std::fmt;

use gdu_types::ByteRange;
use serde::{Deserialize, Serialize};

/// Stable identity of a presentable.
///
/// Ordering follows device ids, so sorting by id yields the object-path order
/// a tree view shows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PresentableId {
    Drive(String),
    ActivatableDrive(String),
    Volume(String),
    Hole {
        enclosing: Box<PresentableId>,
        offset: u64,
    },
}

impl PresentableId {
    pub fn hole(enclosing: &PresentableId, offset: u64) -> Self {
        Self::Hole {
            enclosing: Box::new(enclosing.clone()),
            offset,
        }
    }

    /// Key for an activatable drive: the RAID UUID when known, else the
    /// device that introduced the array.
    pub fn activatable(uuid: Option<&str>, device: &str) -> Self {
        match uuid {
            Some(uuid) => Self::ActivatableDrive(uuid.to_string()),
            None => Self::ActivatableDrive(format!("device:{device}")),
        }
    }
}

impl fmt::Display for PresentableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drive(device) => write!(f, "drive:{device}"),
            Self::ActivatableDrive(key) => write!(f, "activatable:{key}"),
            Self::Volume(device) => write!(f, "volume:{device}"),
            Self::Hole { enclosing, offset } => write!(f, "hole:{enclosing}@{offset}"),
        }
    }
}

/// A RAID array as the user sees it: possibly not running, possibly with
/// only some of its components present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivatableDrive {
    /// RAID UUID shared by the array and its components, once known
    pub(crate) uuid: Option<String>,

    /// The running array device, absent while the array is stopped
    pub(crate) device: Option<String>,

    /// Component devices, in arrival order
    pub(crate) slaves: Vec<String>,
}

impl ActivatableDrive {
    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    pub fn slaves(&self) -> &[String] {
        &self.slaves
    }

    pub fn has_slave(&self, id: &str) -> bool {
        self.slaves.iter().any(|slave| slave == id)
    }

    /// Returns false if `id` already was a slave.
    pub(crate) fn add_slave(&mut self, id: &str) -> bool {
        if self.has_slave(id) {
            return false;
        }
        self.slaves.push(id.to_string());
        true
    }

    pub(crate) fn remove_slave(&mut self, id: &str) -> bool {
        let before = self.slaves.len();
        self.slaves.retain(|slave| slave != id);
        self.slaves.len() != before
    }

    /// Neither running nor backed by any component.
    pub fn is_empty(&self) -> bool {
        self.device.is_none() && self.slaves.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentableKind {
    /// A whole physical disk
    Drive { device: String },
    /// A partition, a whole-disk filesystem, or an unlocked cleartext device
    Volume { device: String },
    /// Unallocated space within a drive or an extended partition
    VolumeHole { offset: u64, size: u64 },
    ActivatableDrive(ActivatableDrive),
}

/// One node of the presentable graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentable {
    pub(crate) id: PresentableId,
    pub(crate) enclosing: Option<PresentableId>,
    pub(crate) kind: PresentableKind,
    /// Byte offset on the drive, set for partitions and holes
    pub(crate) position: Option<u64>,
}

impl Presentable {
    pub(crate) fn drive(device: &str) -> Self {
        Self {
            id: PresentableId::Drive(device.to_string()),
            enclosing: None,
            kind: PresentableKind::Drive {
                device: device.to_string(),
            },
            position: None,
        }
    }

    pub(crate) fn volume(device: &str, enclosing: Option<PresentableId>) -> Self {
        Self {
            id: PresentableId::Volume(device.to_string()),
            enclosing,
            kind: PresentableKind::Volume {
                device: device.to_string(),
            },
            position: None,
        }
    }

    pub(crate) fn with_position(mut self, position: Option<u64>) -> Self {
        self.position = position;
        self
    }

    pub(crate) fn hole(enclosing: &PresentableId, range: ByteRange) -> Self {
        Self {
            id: PresentableId::hole(enclosing, range.start),
            enclosing: Some(enclosing.clone()),
            kind: PresentableKind::VolumeHole {
                offset: range.start,
                size: range.size(),
            },
            position: Some(range.start),
        }
    }

    pub(crate) fn activatable(id: PresentableId, drive: ActivatableDrive) -> Self {
        Self {
            id,
            enclosing: None,
            kind: PresentableKind::ActivatableDrive(drive),
            position: None,
        }
    }

    pub fn id(&self) -> &PresentableId {
        &self.id
    }

    pub fn enclosing(&self) -> Option<&PresentableId> {
        self.enclosing.as_ref()
    }

    pub fn kind(&self) -> &PresentableKind {
        &self.kind
    }

    pub fn position(&self) -> Option<u64> {
        self.position
    }

    /// Sibling order: positioned presentables by offset, then by id.
    pub fn sort_key(&self) -> (Option<u64>, &PresentableId) {
        (self.position, &self.id)
    }

    pub fn is_top_level(&self) -> bool {
        self.enclosing.is_none()
    }

    /// Id of the device backing this presentable, if any.
    pub fn device_id(&self) -> Option<&str> {
        match &self.kind {
            PresentableKind::Drive { device } | PresentableKind::Volume { device } => {
                Some(device.as_str())
            }
            PresentableKind::ActivatableDrive(drive) => drive.device(),
            PresentableKind::VolumeHole { .. } => None,
        }
    }

    pub fn is_hole(&self) -> bool {
        matches!(self.kind, PresentableKind::VolumeHole { .. })
    }

    pub fn as_activatable(&self) -> Option<&ActivatableDrive> {
        match &self.kind {
            PresentableKind::ActivatableDrive(drive) => Some(drive),
            _ => None,
        }
    }

    pub(crate) fn as_activatable_mut(&mut self) -> Option<&mut ActivatableDrive> {
        match &mut self.kind {
            PresentableKind::ActivatableDrive(drive) => Some(drive),
            _ => None,
        }
    }

    /// Byte range of a hole.
    pub fn hole_range(&self) -> Option<ByteRange> {
        match self.kind {
            PresentableKind::VolumeHole { offset, size } => Some(ByteRange::from_offset(offset, size)),
            _ => None,
        }
    }
}
