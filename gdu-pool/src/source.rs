// SPDX-License-Identifier: GPL-3.0-only

use async_trait::async_trait;
use gdu_types::{DaemonInfo, DeviceRecord, JobState};

use crate::error::SourceError;

/// Change notification from the storage daemon, keyed by device id.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Added(String),
    Removed(String),
    Changed(String),
    /// Only the job state moved; the rest of the record is unchanged.
    JobChanged(String, JobState),
}

impl DeviceEvent {
    pub fn device_id(&self) -> &str {
        match self {
            Self::Added(id) | Self::Removed(id) | Self::Changed(id) | Self::JobChanged(id, _) => id,
        }
    }
}

/// Read side of the storage daemon.
///
/// Events are delivered separately as a `Stream` of [`DeviceEvent`]s, see
/// [`Pool::run`](crate::Pool::run).
#[async_trait]
pub trait DeviceSource: Send + Sync {
    /// Full current property snapshot of one device.
    async fn fetch_properties(&self, id: &str) -> Result<DeviceRecord, SourceError>;

    /// Ids of every device the daemon currently knows.
    async fn enumerate_all(&self) -> Result<Vec<String>, SourceError>;

    async fn daemon_info(&self) -> Result<DaemonInfo, SourceError>;
}
