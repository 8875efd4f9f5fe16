// SPDX-License-Identifier: GPL-3.0-only

//! Activatable drives: RAID arrays known through their components, their
//! running array device, or both.

use gdu_types::DeviceRecord;
use tracing::{debug, warn};

use super::Pool;
use crate::presentable::{ActivatableDrive, Presentable, PresentableId};

impl Pool {
    /// The activatable drive that lists `device` as a slave.
    pub(super) fn activatable_containing(&self, device: &str) -> Option<PresentableId> {
        self.presentables
            .values()
            .find(|p| p.as_activatable().is_some_and(|ad| ad.has_slave(device)))
            .map(|p| p.id().clone())
    }

    /// Whether `drive` belongs to the array with RAID UUID `uuid`. The slave
    /// `exclude` is not consulted, so a component never vouches for itself.
    fn activatable_has_uuid(&self, drive: &ActivatableDrive, uuid: &str, exclude: &str) -> bool {
        if drive.uuid() == Some(uuid) {
            return true;
        }
        if drive
            .device()
            .and_then(|device| self.registry.get(device))
            .and_then(DeviceRecord::md_array_uuid)
            == Some(uuid)
        {
            return true;
        }
        drive
            .slaves()
            .iter()
            .filter(|slave| slave.as_str() != exclude)
            .filter_map(|slave| self.registry.get(slave))
            .any(|record| record.md_component_uuid() == Some(uuid))
    }

    /// The activatable drive a component belongs to, matched by RAID UUID or
    /// by the running array listing the component.
    pub(super) fn find_activatable_for_component(
        &self,
        record: &DeviceRecord,
    ) -> Option<PresentableId> {
        let uuid = record.md_component_uuid();

        self.presentables
            .values()
            .find(|p| {
                let Some(drive) = p.as_activatable() else {
                    return false;
                };
                if let Some(uuid) = uuid
                    && self.activatable_has_uuid(drive, uuid, &record.id)
                {
                    return true;
                }
                drive
                    .device()
                    .and_then(|device| self.registry.get(device))
                    .is_some_and(|array| array.md_array_references(&record.id))
            })
            .map(|p| p.id().clone())
    }

    /// The activatable drive a running array belongs to.
    fn find_activatable_for_array(&self, record: &DeviceRecord) -> Option<PresentableId> {
        let uuid = record.md_array_uuid();

        self.presentables
            .values()
            .find(|p| {
                let Some(drive) = p.as_activatable() else {
                    return false;
                };
                if drive.device() == Some(record.id.as_str()) {
                    return true;
                }
                if let Some(uuid) = uuid
                    && self.activatable_has_uuid(drive, uuid, &record.id)
                {
                    return true;
                }
                drive
                    .slaves()
                    .iter()
                    .any(|slave| record.md_array_references(slave))
            })
            .map(|p| p.id().clone())
    }

    fn unique_activatable_id(&self, base: PresentableId) -> PresentableId {
        let PresentableId::ActivatableDrive(key) = &base else {
            return base;
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while self.presentables.contains_key(&candidate) {
            candidate = PresentableId::ActivatableDrive(format!("{key}#{n}"));
            n += 1;
        }
        candidate
    }

    /// Make sure the component `device` is a slave of an activatable drive,
    /// creating the drive if no existing one matches. Idempotent.
    pub fn ensure_activatable_drive_for_component(&mut self, device: &str) -> Option<PresentableId> {
        let id = self.attach_component(device);
        self.flush();
        id
    }

    pub(super) fn attach_component(&mut self, device: &str) -> Option<PresentableId> {
        let Some(record) = self.registry.get(device).cloned() else {
            warn!("Cannot attach unknown device {device} to a RAID array");
            return None;
        };
        if !record.is_md_component() {
            warn!("Device {device} is not a RAID component");
            return None;
        }

        let uuid = record.md_component_uuid().map(str::to_string);
        match self.find_activatable_for_component(&record) {
            Some(id) => {
                let mut changed = false;
                if let Some(drive) = self
                    .presentables
                    .get_mut(&id)
                    .and_then(Presentable::as_activatable_mut)
                {
                    if drive.uuid.is_none() && uuid.is_some() {
                        drive.uuid = uuid;
                        changed = true;
                    }
                    changed |= drive.add_slave(device);
                }
                if changed {
                    debug!(%id, device, "RAID component attached");
                    self.emit_changed(&id);
                }
                Some(id)
            }
            None => {
                let id = self.unique_activatable_id(PresentableId::activatable(
                    uuid.as_deref(),
                    device,
                ));
                let drive = ActivatableDrive {
                    uuid,
                    device: None,
                    slaves: vec![device.to_string()],
                };
                self.insert_presentable(Presentable::activatable(id.clone(), drive));
                Some(id)
            }
        }
    }

    /// Attach a running array to its activatable drive, creating the drive
    /// when none of its components has been seen yet.
    pub(super) fn attach_array(&mut self, record: &DeviceRecord) -> PresentableId {
        let uuid = record.md_array_uuid().map(str::to_string);

        if let Some(id) = self.find_activatable_for_array(record) {
            if let Some(drive) = self
                .presentables
                .get_mut(&id)
                .and_then(Presentable::as_activatable_mut)
            {
                drive.device = Some(record.id.clone());
                if drive.uuid.is_none() {
                    drive.uuid = uuid;
                }
            }
            debug!(%id, array = %record.id, "RAID array started");
            self.emit_changed(&id);
            return id;
        }

        let id = self.unique_activatable_id(PresentableId::activatable(uuid.as_deref(), &record.id));
        let drive = ActivatableDrive {
            uuid,
            device: Some(record.id.clone()),
            slaves: Vec::new(),
        };
        self.insert_presentable(Presentable::activatable(id.clone(), drive));
        id
    }

    /// The array device `device` went away; keep the drive while components remain.
    pub(super) fn detach_array(&mut self, id: &PresentableId, device: &str) {
        if let Some(drive) = self
            .presentables
            .get_mut(id)
            .and_then(Presentable::as_activatable_mut)
            && drive.device() == Some(device)
        {
            drive.device = None;
        }
        debug!(%id, array = device, "RAID array stopped");
        if !self.remove_activatable_if_empty(id) {
            self.emit_changed(id);
        }
    }

    pub(super) fn remove_slave(&mut self, id: &PresentableId, slave: &str) {
        let removed = self
            .presentables
            .get_mut(id)
            .and_then(Presentable::as_activatable_mut)
            .is_some_and(|drive| drive.remove_slave(slave));
        if !removed {
            return;
        }

        debug!(%id, slave, "RAID component detached");
        if !self.remove_activatable_if_empty(id) {
            self.emit_changed(id);
        }
    }

    /// Remove the drive once it has neither an array device nor components.
    fn remove_activatable_if_empty(&mut self, id: &PresentableId) -> bool {
        let empty = self
            .presentables
            .get(id)
            .and_then(Presentable::as_activatable)
            .is_some_and(ActivatableDrive::is_empty);
        if empty {
            self.remove_presentable(id);
        }
        empty
    }

    /// An array that reports its RAID UUID late fills it in on its drive.
    pub(super) fn refresh_array_uuid(&mut self, record: &DeviceRecord) {
        let Some(uuid) = record.md_array_uuid() else {
            return;
        };
        let Some(id) = self.drives.get(&record.id).cloned() else {
            return;
        };
        let updated = match self
            .presentables
            .get_mut(&id)
            .and_then(Presentable::as_activatable_mut)
        {
            Some(drive) if drive.uuid.is_none() => {
                drive.uuid = Some(uuid.to_string());
                true
            }
            _ => false,
        };
        if updated {
            self.emit_changed(&id);
        }
    }
}
