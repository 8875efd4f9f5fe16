// SPDX-License-Identifier: GPL-3.0-only

//! Error types for UDisks2 access

use gdu_pool::{OperationError, OperationErrorKind, SourceError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiskError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("D-Bus error: {0}")]
    DBusError(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("{device} has no {interface} interface")]
    MissingInterface { device: String, interface: String },

    #[error("Zbus Error")]
    ZbusError(#[from] zbus::Error),
}

impl From<zbus::fdo::Error> for DiskError {
    fn from(e: zbus::fdo::Error) -> Self {
        Self::DBusError(e.to_string())
    }
}

impl From<DiskError> for SourceError {
    fn from(e: DiskError) -> Self {
        match e {
            DiskError::DeviceNotFound(id) => Self::NotFound(id),
            DiskError::MissingInterface { device, interface } => Self::Malformed {
                id: device,
                reason: format!("missing {interface}"),
            },
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Well-known UDisks2 error names and the kind they map to.
const ERROR_KINDS: &[(&str, OperationErrorKind)] = &[
    ("org.freedesktop.UDisks2.Error.NotAuthorized", OperationErrorKind::PermissionDenied),
    (
        "org.freedesktop.UDisks2.Error.NotAuthorizedCanObtain",
        OperationErrorKind::PermissionDenied,
    ),
    (
        "org.freedesktop.UDisks2.Error.NotAuthorizedDismissed",
        OperationErrorKind::Cancelled,
    ),
    ("org.freedesktop.UDisks2.Error.DeviceBusy", OperationErrorKind::Busy),
    ("org.freedesktop.UDisks2.Error.Cancelled", OperationErrorKind::Cancelled),
    ("org.freedesktop.UDisks2.Error.NotSupported", OperationErrorKind::Unsupported),
    ("org.freedesktop.UDisks2.Error.NotFound", OperationErrorKind::NotFound),
];

fn kind_for_message(message: &str) -> OperationErrorKind {
    ERROR_KINDS
        .iter()
        .find(|(name, _)| message.contains(name))
        .map(|(_, kind)| *kind)
        .unwrap_or(OperationErrorKind::Failed)
}

impl From<DiskError> for OperationError {
    fn from(e: DiskError) -> Self {
        let kind = match &e {
            DiskError::DeviceNotFound(_) => OperationErrorKind::NotFound,
            DiskError::MissingInterface { .. } => OperationErrorKind::Unsupported,
            DiskError::ZbusError(zbus::Error::MethodError(name, _, _)) => {
                kind_for_message(name.as_str())
            }
            other => kind_for_message(&other.to_string()),
        };
        let message = match e {
            DiskError::ZbusError(zbus::Error::MethodError(name, detail, _)) => {
                detail.unwrap_or_else(|| name.to_string())
            }
            other => other.to_string(),
        };
        OperationError::new(kind, message)
    }
}
