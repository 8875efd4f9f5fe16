// SPDX-License-Identifier: GPL-3.0-only

//! Canonical data models for the disk utility device pool
//!
//! These types are shared by every layer of the stack:
//!
//! - **gdu-udisks**: builds `DeviceRecord`s from the storage daemon's objects
//! - **gdu-pool**: stores records and derives the presentable graph from them
//! - **gdu-monitor**: renders records and issues `Operation` requests
//!
//! A `DeviceRecord` is always a full snapshot. Records are replaced wholesale on
//! refresh, never merged field by field.

pub mod common;
pub mod daemon;
pub mod device;
pub mod job;
pub mod operation;
pub mod partition;

pub use common::{ByteRange, bytes_to_pretty};
pub use daemon::{DaemonInfo, KnownFilesystem};
pub use device::{DeviceRecord, DriveInfo, MdArrayInfo, MdComponentInfo};
pub use job::JobState;
pub use operation::{Operation, OperationOutput, Secret, SmartSelfTestKind};
pub use partition::{
    PartitionEntry, PartitionFlag, PartitionInfo, PartitionScheme, PartitionTableInfo,
    parse_type_code,
};
