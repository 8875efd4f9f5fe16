// SPDX-License-Identifier: GPL-3.0-only

//! UDisks2 plumbing for the device pool.
//!
//! Device ids are UDisks2 block object paths. [`UDisksSource`] projects the
//! daemon's objects into [`gdu_types::DeviceRecord`]s, [`DeviceEventStream`]
//! turns its signals into pool events and [`UDisksBackend`] carries mutation
//! requests back to it.

pub mod daemon;
pub mod error;
pub mod manager;
pub mod operations;
pub mod properties;
pub mod source;
pub mod values;

pub use daemon::read_daemon_info;
pub use error::DiskError;
pub use manager::{DeviceEventStream, DiskManager, UDISKS_SERVICE, managed_objects};
pub use operations::UDisksBackend;
pub use properties::{device_record, partition_flags, raw_partition_flags};
pub use source::UDisksSource;
