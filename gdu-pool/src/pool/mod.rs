// SPDX-License-Identifier: GPL-3.0-only

//! The device pool
//!
//! `Pool` owns the device registry and the presentable graph derived from it.
//! Daemon events are applied one at a time; every mutation an event causes is
//! complete before any listener hears about it.

mod events;
mod layout;
mod raid;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use futures::{Stream, StreamExt};
use gdu_types::{DaemonInfo, DeviceRecord, KnownFilesystem, Operation};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::error::{OperationError, OperationErrorKind, PoolError, Result};
use crate::notify::{ListenerId, PoolEvent, PoolListener, dispatch};
use crate::operations::{OperationBackend, OperationResult};
use crate::presentable::{Presentable, PresentableId};
use crate::registry::DeviceRegistry;
use crate::source::{DeviceEvent, DeviceSource};

pub struct Pool {
    config: PoolConfig,
    source: Arc<dyn DeviceSource>,
    backend: Option<Arc<dyn OperationBackend>>,
    daemon: DaemonInfo,
    registry: DeviceRegistry,
    presentables: BTreeMap<PresentableId, Presentable>,
    /// Drive device id to its Drive or ActivatableDrive presentable
    drives: HashMap<String, PresentableId>,
    /// Device id to its Volume presentable
    volumes: HashMap<String, PresentableId>,
    /// Drive device id to the holes computed for it
    holes: HashMap<String, Vec<PresentableId>>,
    /// Devices whose enclosing presentable is provisional or missing
    deferred: BTreeSet<String>,
    listeners: Vec<(ListenerId, Box<dyn PoolListener>)>,
    next_listener: u64,
    pending: Vec<PoolEvent>,
}

impl Pool {
    /// An empty pool. Nothing is read from the daemon until [`Pool::prime`].
    pub fn new(source: Arc<dyn DeviceSource>, config: PoolConfig) -> Self {
        Self {
            config,
            source,
            backend: None,
            daemon: DaemonInfo::default(),
            registry: DeviceRegistry::new(),
            presentables: BTreeMap::new(),
            drives: HashMap::new(),
            volumes: HashMap::new(),
            holes: HashMap::new(),
            deferred: BTreeSet::new(),
            listeners: Vec::new(),
            next_listener: 0,
            pending: Vec::new(),
        }
    }

    /// Read daemon properties and prime the pool with every known device.
    pub async fn connect(source: Arc<dyn DeviceSource>, config: PoolConfig) -> Result<Self> {
        let mut pool = Self::new(source, config);
        pool.daemon = pool
            .source
            .daemon_info()
            .await
            .map_err(PoolError::DaemonInfo)?;
        pool.prime().await?;

        info!(
            daemon_version = %pool.daemon.version,
            devices = pool.registry.len(),
            presentables = pool.presentables.len(),
            "Device pool ready"
        );
        Ok(pool)
    }

    pub fn with_backend(mut self, backend: Arc<dyn OperationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Enumerate all devices and feed each through the add path.
    pub async fn prime(&mut self) -> Result<()> {
        let ids = self
            .source
            .enumerate_all()
            .await
            .map_err(PoolError::Enumerate)?;

        for id in priming_order(ids, self.config.prime_arrays_last) {
            self.on_device_added(&id).await;
        }
        Ok(())
    }

    pub async fn handle_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Added(id) => self.on_device_added(&id).await,
            DeviceEvent::Removed(id) => self.on_device_removed(&id),
            DeviceEvent::Changed(id) => self.on_device_changed(&id).await,
            DeviceEvent::JobChanged(id, job) => self.on_device_job_changed(&id, job),
        }
    }

    /// Apply events until the stream ends.
    pub async fn run<S>(&mut self, mut events: S)
    where
        S: Stream<Item = DeviceEvent> + Unpin,
    {
        while let Some(event) = events.next().await {
            self.handle_event(event).await;
        }
        debug!("Device event stream ended");
    }

    // === Listeners ===

    pub fn add_listener(&mut self, listener: Box<dyn PoolListener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: PoolEvent) {
        self.pending.push(event);
    }

    /// Deliver everything queued while handling the current event.
    fn flush(&mut self) {
        let events = std::mem::take(&mut self.pending);
        for event in &events {
            for (_, listener) in &mut self.listeners {
                dispatch(listener.as_mut(), event);
            }
        }
    }

    // === Queries ===

    pub fn get(&self, id: &PresentableId) -> Option<&Presentable> {
        self.presentables.get(id)
    }

    /// Every presentable, ordered by id.
    pub fn list_all(&self) -> Vec<&Presentable> {
        self.presentables.values().collect()
    }

    /// Presentables whose enclosing presentable is `id`, partitions and
    /// holes in on-disk order.
    pub fn list_enclosed(&self, id: &PresentableId) -> Vec<&Presentable> {
        let mut enclosed: Vec<&Presentable> = self
            .presentables
            .values()
            .filter(|p| p.enclosing() == Some(id))
            .collect();
        enclosed.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        enclosed
    }

    /// The drive-like presentable for `device` if there is one, else its volume.
    pub fn find_by_device_id(&self, device: &str) -> Option<&Presentable> {
        self.drive_for_device(device)
            .or_else(|| self.volume_for_device(device))
    }

    pub fn drive_for_device(&self, device: &str) -> Option<&Presentable> {
        self.drives.get(device).and_then(|id| self.presentables.get(id))
    }

    pub fn volume_for_device(&self, device: &str) -> Option<&Presentable> {
        self.volumes.get(device).and_then(|id| self.presentables.get(id))
    }

    pub fn activatable_drives(&self) -> Vec<&Presentable> {
        self.presentables
            .values()
            .filter(|p| p.as_activatable().is_some())
            .collect()
    }

    /// Holes computed for the drive backed by `device`, including those inside
    /// its extended partition.
    pub fn holes_for_drive(&self, device: &str) -> Vec<&Presentable> {
        self.holes
            .get(device)
            .map(|ids| ids.iter().filter_map(|id| self.presentables.get(id)).collect())
            .unwrap_or_default()
    }

    /// Devices still waiting for their enclosing presentable.
    pub fn deferred_devices(&self) -> Vec<&str> {
        self.deferred.iter().map(String::as_str).collect()
    }

    pub fn device(&self, id: &str) -> Option<&DeviceRecord> {
        self.registry.get(id)
    }

    pub fn devices(&self) -> Vec<&DeviceRecord> {
        self.registry.all()
    }

    pub fn daemon_info(&self) -> &DaemonInfo {
        &self.daemon
    }

    pub fn daemon_version(&self) -> &str {
        &self.daemon.version
    }

    pub fn supports_luks_devices(&self) -> bool {
        self.daemon.supports_luks_devices
    }

    pub fn known_filesystems(&self) -> &[KnownFilesystem] {
        &self.daemon.known_filesystems
    }

    pub fn known_filesystem_by_id(&self, id: &str) -> Option<&KnownFilesystem> {
        self.daemon.known_filesystem(id)
    }

    // === Operations ===

    /// Hand `operation` to the backend on a separate task and report the
    /// outcome to `on_complete`.
    ///
    /// Errors, including unknown target devices, only ever reach the callback.
    pub fn request_operation<F>(&self, operation: Operation, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(OperationResult) + Send + 'static,
    {
        let backend = self.backend.clone();
        let unknown = operation
            .devices()
            .into_iter()
            .find(|device| !self.registry.contains(device))
            .map(str::to_string);

        tokio::spawn(async move {
            let name = operation.name();
            let result = match (unknown, backend) {
                (Some(device), _) => Err(OperationError::new(
                    OperationErrorKind::NotFound,
                    format!("Unknown device: {device}"),
                )),
                (None, None) => Err(OperationError::new(
                    OperationErrorKind::Unsupported,
                    "No operation backend configured",
                )),
                (None, Some(backend)) => backend.execute(operation).await,
            };

            match &result {
                Ok(output) => debug!(operation = name, ?output, "Operation finished"),
                Err(e) => warn!(operation = name, "Operation failed: {e}"),
            }
            on_complete(result);
        })
    }

    /// Assemble and start the array made of `components`.
    pub fn md_start<F>(&self, components: Vec<String>, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(OperationResult) + Send + 'static,
    {
        self.request_operation(Operation::MdStart { components }, on_complete)
    }
}

/// Sort ids, optionally moving device-mapper and md array devices to the end
/// so their components are known by the time they are added.
pub fn priming_order(mut ids: Vec<String>, arrays_last: bool) -> Vec<String> {
    ids.sort();
    if arrays_last {
        ids.sort_by_key(|id| is_array_device(id));
    }
    ids
}

fn is_array_device(id: &str) -> bool {
    let name = id.rsplit('/').next().unwrap_or(id);
    name.starts_with("dm_") || name.starts_with("dm-") || name.starts_with("md")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_are_primed_last() {
        let ids = vec![
            "/org/freedesktop/UDisks2/block_devices/md127".to_string(),
            "/org/freedesktop/UDisks2/block_devices/sdb1".to_string(),
            "/org/freedesktop/UDisks2/block_devices/dm_2d0".to_string(),
            "/org/freedesktop/UDisks2/block_devices/sda".to_string(),
            "/org/freedesktop/UDisks2/block_devices/sda1".to_string(),
        ];

        let ordered = priming_order(ids.clone(), true);
        assert_eq!(
            ordered,
            vec![
                "/org/freedesktop/UDisks2/block_devices/sda",
                "/org/freedesktop/UDisks2/block_devices/sda1",
                "/org/freedesktop/UDisks2/block_devices/sdb1",
                "/org/freedesktop/UDisks2/block_devices/dm_2d0",
                "/org/freedesktop/UDisks2/block_devices/md127",
            ]
        );

        let plain = priming_order(ids, false);
        assert_eq!(plain[0], "/org/freedesktop/UDisks2/block_devices/dm_2d0");
    }
}
