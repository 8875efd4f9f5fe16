// SPDX-License-Identifier: GPL-3.0-only

//! Device pool: turns the storage daemon's flat device list into the
//! drive / volume / free-space / RAID graph a disk utility presents.
//!
//! The pool talks to the daemon only through two seams:
//!
//! - [`DeviceSource`] for property snapshots, enumeration and daemon info
//! - [`OperationBackend`] for mutation requests
//!
//! Change events are fed in with [`Pool::handle_event`] or [`Pool::run`];
//! observers subscribe with [`Pool::add_listener`].

pub mod config;
pub mod error;
pub mod holes;
pub mod notify;
pub mod operations;
pub mod pool;
pub mod presentable;
pub mod registry;
pub mod source;
pub mod tree;

pub use config::PoolConfig;
pub use error::{ConfigError, OperationError, OperationErrorKind, PoolError, Result, SourceError};
pub use notify::{ChannelListener, ListenerId, PoolEvent, PoolListener};
pub use operations::{OperationBackend, OperationResult};
pub use pool::{Pool, priming_order};
pub use presentable::{ActivatableDrive, Presentable, PresentableId, PresentableKind};
pub use registry::DeviceRegistry;
pub use source::{DeviceEvent, DeviceSource};
pub use tree::PresentableTree;
