// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by a [`DeviceSource`](crate::DeviceSource)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Daemon unavailable: {0}")]
    Unavailable(String),

    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Malformed properties for {id}: {reason}")]
    Malformed { id: String, reason: String },
}

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Failed to fetch properties for {id}")]
    Fetch {
        id: String,
        #[source]
        source: SourceError,
    },

    #[error("Invalid record for {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Failed to enumerate devices")]
    Enumerate(#[source] SourceError),

    #[error("Failed to read daemon properties")]
    DaemonInfo(#[source] SourceError),
}

pub type Result<T> = std::result::Result<T, PoolError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationErrorKind {
    NotFound,
    PermissionDenied,
    Busy,
    Unsupported,
    Cancelled,
    Failed,
}

/// Failure of a mutation request, handed to its completion callback
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct OperationError {
    pub kind: OperationErrorKind,
    pub message: String,
}

impl OperationError {
    pub fn new(kind: OperationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(OperationErrorKind::Failed, message)
    }
}
