// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashMap;

use async_trait::async_trait;
use gdu_pool::{DeviceSource, SourceError};
use gdu_types::{DaemonInfo, DeviceRecord};
use tracing::debug;
use zbus::Connection;

use crate::daemon::read_daemon_info;
use crate::error::DiskError;
use crate::manager::{UDisks2ManagerProxy, managed_objects};
use crate::properties::device_record;

/// [`DeviceSource`] backed by the UDisks2 daemon. Device ids are block object
/// paths.
#[derive(Clone)]
pub struct UDisksSource {
    connection: Connection,
}

impl UDisksSource {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    async fn record(&self, id: &str) -> Result<DeviceRecord, DiskError> {
        let objects = managed_objects(&self.connection).await?;
        device_record(id, &objects)
    }

    async fn block_devices(&self) -> Result<Vec<String>, DiskError> {
        let manager = UDisks2ManagerProxy::new(&self.connection).await?;
        let paths = manager.get_block_devices(HashMap::new()).await?;
        Ok(paths.into_iter().map(|path| path.to_string()).collect())
    }
}

#[async_trait]
impl DeviceSource for UDisksSource {
    async fn fetch_properties(&self, id: &str) -> Result<DeviceRecord, SourceError> {
        let record = self.record(id).await?;
        debug!(device = id, size = record.size, "Fetched device properties");
        Ok(record)
    }

    async fn enumerate_all(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.block_devices().await?)
    }

    async fn daemon_info(&self) -> Result<DaemonInfo, SourceError> {
        Ok(read_daemon_info(&self.connection).await?)
    }
}
