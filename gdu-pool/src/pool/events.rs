// SPDX-License-Identifier: GPL-3.0-only

use gdu_types::JobState;
use tracing::{debug, warn};

use super::Pool;
use crate::notify::PoolEvent;
use crate::presentable::{Presentable, PresentableId};

impl Pool {
    /// Fetch the new device and extend the presentable graph with it.
    ///
    /// A fetch failure drops the event: the device stays unknown.
    pub async fn on_device_added(&mut self, id: &str) {
        if self.registry.contains(id) {
            debug!("Device {id} added twice, refreshing instead");
            self.on_device_changed(id).await;
            return;
        }

        let record = match self.registry.upsert(id, &*self.source).await {
            Ok(record) => record.clone(),
            Err(e) => {
                warn!("Ignoring added device {id}: {e}");
                return;
            }
        };
        debug!(device = id, "Device added");
        self.emit(PoolEvent::DeviceAdded(id.to_string()));

        if record.is_drive {
            let presentable = if record.is_md_array() {
                self.attach_array(&record)
            } else {
                let drive = Presentable::drive(id);
                let drive_id = drive.id().clone();
                self.insert_presentable(drive);
                drive_id
            };
            self.drives.insert(id.to_string(), presentable);
            self.refresh_drive_layout(id);
        }

        if record.is_partition() {
            self.add_partition_volume(&record);
        }

        if record.is_crypto_cleartext() {
            self.add_cleartext_volume(&record);
        }

        if record.is_md_component() {
            self.attach_component(id);
        }

        self.resolve_deferred();
        self.flush();
    }

    /// Forget the device and everything derived from it.
    pub fn on_device_removed(&mut self, id: &str) {
        let Some(record) = self.registry.remove(id) else {
            warn!("Ignoring removal of unknown device {id}");
            return;
        };
        debug!(device = id, "Device removed");
        self.emit(PoolEvent::DeviceRemoved(id.to_string()));
        self.deferred.remove(id);

        if self.drives.contains_key(id) {
            self.remove_holes(id);
        }

        // Volumes go before the drive so they are not re-homed on the way out.
        let backed: Vec<PresentableId> = self
            .presentables
            .values()
            .filter(|p| p.as_activatable().is_none() && p.device_id() == Some(id))
            .map(|p| p.id().clone())
            .rev()
            .collect();
        for presentable in backed {
            self.remove_presentable(&presentable);
        }

        if let Some(drive) = self.drives.remove(id)
            && matches!(drive, PresentableId::ActivatableDrive(_))
        {
            self.detach_array(&drive, id);
        }

        if record.is_extended_partition()
            && let Some(slave) = record.partition_slave()
            && self.drives.contains_key(slave)
        {
            self.rebuild_holes(slave);
        }

        if let Some(activatable) = self.activatable_containing(id) {
            self.remove_slave(&activatable, id);
        }

        self.resolve_deferred();
        self.flush();
    }

    /// Refresh the device's record and reconcile everything that depends on it.
    ///
    /// A fetch failure keeps the previous record and emits nothing.
    pub async fn on_device_changed(&mut self, id: &str) {
        let Some(previous) = self.registry.get(id).cloned() else {
            warn!("Ignoring change of unknown device {id}");
            return;
        };
        let prior = self.activatable_containing(id);

        let record = match self.registry.upsert(id, &*self.source).await {
            Ok(record) => record.clone(),
            Err(e) => {
                warn!("Keeping stale record for {id}: {e}");
                return;
            }
        };
        debug!(device = id, "Device changed");
        self.emit(PoolEvent::DeviceChanged(id.to_string()));
        for presentable in self.backed_by(id) {
            self.emit_changed(&presentable);
        }

        let current = if record.is_md_component() {
            self.find_activatable_for_component(&record)
        } else {
            None
        };
        if let Some(prior) = prior
            && current.as_ref() != Some(&prior)
        {
            self.remove_slave(&prior, id);
        }
        if record.is_md_component() {
            self.attach_component(id);
        }

        if record.is_md_array() {
            self.refresh_array_uuid(&record);
        }

        if self.drives.contains_key(id) {
            self.refresh_drive_layout(id);
        }

        if previous.partition != record.partition {
            let mut slaves: Vec<&str> = previous
                .partition_slave()
                .into_iter()
                .chain(record.partition_slave())
                .collect();
            slaves.dedup();
            for slave in slaves {
                if self.drives.contains_key(slave) {
                    self.rebuild_holes(slave);
                }
            }
            self.replace_volume(&record);

            if previous.is_extended_partition() != record.is_extended_partition()
                && let Some(slave) = record.partition_slave()
            {
                self.replace_logical_volumes(slave);
            }
        }

        self.resolve_deferred();
        self.flush();
    }

    /// Store the new job state and tell listeners. Nothing else is refreshed.
    pub fn on_device_job_changed(&mut self, id: &str, job: JobState) {
        if self.registry.set_job(id, job).is_none() {
            warn!("Ignoring job change of unknown device {id}");
            return;
        }
        self.emit(PoolEvent::DeviceJobChanged(id.to_string()));

        for presentable in self.backed_by(id) {
            if let Some(snapshot) = self.presentables.get(&presentable).cloned() {
                self.emit(PoolEvent::PresentableJobChanged(snapshot));
            }
        }
        self.flush();
    }

    /// Presentables whose backing device is `id`.
    fn backed_by(&self, id: &str) -> Vec<PresentableId> {
        self.presentables
            .values()
            .filter(|p| p.device_id() == Some(id))
            .map(|p| p.id().clone())
            .collect()
    }
}
