// SPDX-License-Identifier: GPL-3.0-only

use gdu_types::{ByteRange, DeviceRecord};
use tracing::{debug, warn};

use super::Pool;
use crate::holes::compute_holes;
use crate::notify::PoolEvent;
use crate::presentable::{Presentable, PresentableId};

/// Where a device's volume belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Placement {
    pub(super) enclosing: Option<PresentableId>,
    /// False when `enclosing` is a fallback or missing and may improve later.
    pub(super) settled: bool,
}

impl Pool {
    pub(super) fn insert_presentable(&mut self, presentable: Presentable) {
        debug!(id = %presentable.id(), "Presentable added");
        self.emit(PoolEvent::PresentableAdded(presentable.clone()));
        self.presentables.insert(presentable.id().clone(), presentable);
    }

    /// Remove a presentable and clean every index that names it. Holes it
    /// enclosed go with it; anything else it enclosed is re-placed.
    pub(super) fn remove_presentable(&mut self, id: &PresentableId) -> Option<Presentable> {
        let removed = self.presentables.remove(id)?;
        self.drives.retain(|_, drive| drive != id);
        self.volumes.retain(|_, volume| volume != id);
        for holes in self.holes.values_mut() {
            holes.retain(|hole| hole != id);
        }

        debug!(%id, "Presentable removed");
        self.emit(PoolEvent::PresentableRemoved(removed.clone()));
        self.release_children(id);
        Some(removed)
    }

    fn release_children(&mut self, parent: &PresentableId) {
        let children: Vec<PresentableId> = self
            .presentables
            .values()
            .filter(|p| p.enclosing() == Some(parent))
            .map(|p| p.id().clone())
            .collect();

        for child in children {
            if matches!(child, PresentableId::Hole { .. }) {
                self.remove_presentable(&child);
                continue;
            }

            let device = self
                .presentables
                .get(&child)
                .and_then(Presentable::device_id)
                .map(str::to_string);
            let placement = device
                .as_deref()
                .and_then(|device| self.registry.get(device))
                .map(|record| self.placement_for(record))
                .unwrap_or(Placement {
                    enclosing: None,
                    settled: false,
                });

            self.set_enclosing(&child, placement.enclosing);
            if !placement.settled
                && let Some(device) = device
            {
                self.defer(&device);
            }
        }
    }

    pub(super) fn emit_changed(&mut self, id: &PresentableId) {
        if let Some(snapshot) = self.presentables.get(id).cloned() {
            self.emit(PoolEvent::PresentableChanged(snapshot));
        }
    }

    fn set_enclosing(&mut self, id: &PresentableId, enclosing: Option<PresentableId>) {
        let Some(presentable) = self.presentables.get_mut(id) else {
            return;
        };
        if presentable.enclosing == enclosing {
            return;
        }
        debug!(%id, ?enclosing, "Presentable re-parented");
        presentable.enclosing = enclosing;
        let snapshot = presentable.clone();
        self.emit(PoolEvent::PresentableChanged(snapshot));
    }

    fn defer(&mut self, device: &str) {
        if self.config.resolve_deferred {
            self.deferred.insert(device.to_string());
        }
    }

    // === Holes and whole-disk volumes ===

    pub(super) fn refresh_drive_layout(&mut self, drive: &str) {
        self.rebuild_holes(drive);
        self.update_whole_disk(drive);
    }

    pub(super) fn remove_holes(&mut self, drive: &str) {
        let Some(holes) = self.holes.remove(drive) else {
            return;
        };
        for hole in holes {
            if let Some(removed) = self.presentables.remove(&hole) {
                self.emit(PoolEvent::PresentableRemoved(removed));
            }
        }
    }

    /// Replace every hole of `drive` and deliver the resulting notifications.
    pub fn recompute_holes(&mut self, drive: &str) {
        self.rebuild_holes(drive);
        self.flush();
    }

    /// Replace every hole of `drive`: primary gaps at drive level plus the
    /// gaps inside each extended partition of the drive.
    pub(super) fn rebuild_holes(&mut self, drive: &str) {
        self.remove_holes(drive);

        let Some(record) = self.registry.get(drive) else {
            return;
        };
        let Some(drive_id) = self.drives.get(drive).cloned() else {
            return;
        };
        if !record.is_media_available {
            return;
        }
        let Some(table) = &record.partition_table else {
            return;
        };
        let threshold = self.config.hole_threshold(record.size);

        let mut holes: Vec<Presentable> = compute_holes(
            table,
            ByteRange {
                start: 0,
                end: record.size,
            },
            true,
            threshold,
        )
        .into_iter()
        .map(|range| Presentable::hole(&drive_id, range))
        .collect();

        let mut extended: Vec<(&PresentableId, &DeviceRecord)> = self
            .volumes
            .iter()
            .filter_map(|(device, volume)| Some((volume, self.registry.get(device)?)))
            .filter(|(_, part)| {
                part.partition_slave() == Some(drive) && part.is_extended_partition()
            })
            .collect();
        extended.sort_by(|a, b| a.0.cmp(b.0));

        for (volume, part) in extended {
            let Some(info) = &part.partition else {
                continue;
            };
            holes.extend(
                compute_holes(table, info.range(), false, threshold)
                    .into_iter()
                    .map(|range| Presentable::hole(volume, range)),
            );
        }

        let ids: Vec<PresentableId> = holes.iter().map(|h| h.id().clone()).collect();
        for hole in holes {
            self.insert_presentable(hole);
        }
        self.holes.insert(drive.to_string(), ids);
    }

    /// Keep the whole-disk volume in line with the drive: present exactly when
    /// media is available and there is no partition table.
    pub(super) fn update_whole_disk(&mut self, drive: &str) {
        let Some(record) = self.registry.get(drive) else {
            return;
        };
        let wants_volume = record.is_media_available && !record.is_partition_table();
        let volume = self.volumes.get(drive).cloned();

        match (wants_volume, volume) {
            (false, Some(volume)) => {
                self.remove_presentable(&volume);
            }
            (true, None) => {
                let enclosing = self.drives.get(drive).cloned();
                self.add_volume(drive, enclosing);
            }
            _ => {}
        }
    }

    // === Volumes ===

    fn add_volume(&mut self, device: &str, enclosing: Option<PresentableId>) {
        let volume =
            Presentable::volume(device, enclosing).with_position(self.partition_offset(device));
        self.volumes.insert(device.to_string(), volume.id().clone());
        self.insert_presentable(volume);
    }

    pub(super) fn add_partition_volume(&mut self, record: &DeviceRecord) {
        let Some(partition) = &record.partition else {
            return;
        };

        let placement = self.placement_for(record);
        if !placement.settled {
            if partition.is_logical() {
                warn!(
                    "Logical partition {} arrived before its extended partition",
                    record.id
                );
            } else {
                warn!("Partition {} arrived before its drive {}", record.id, partition.slave);
            }
            self.defer(&record.id);
        }
        self.add_volume(&record.id, placement.enclosing);

        if partition.is_extended() && self.drives.contains_key(&partition.slave) {
            self.rebuild_holes(&partition.slave);
        }
    }

    pub(super) fn add_cleartext_volume(&mut self, record: &DeviceRecord) {
        let placement = self.placement_for(record);
        match placement.enclosing {
            Some(enclosing) => self.add_volume(&record.id, Some(enclosing)),
            None => {
                warn!(
                    "Cleartext device {} arrived before its encrypted volume",
                    record.id
                );
                self.defer(&record.id);
            }
        }
    }

    /// Re-place an existing volume after its record changed, or create it if
    /// the device only now became a partition.
    pub(super) fn replace_volume(&mut self, record: &DeviceRecord) {
        let Some(volume) = self.volumes.get(&record.id).cloned() else {
            if record.is_partition() {
                self.add_partition_volume(record);
            }
            return;
        };

        let position = record.partition.as_ref().map(|p| p.offset);
        if let Some(presentable) = self.presentables.get_mut(&volume)
            && presentable.position != position
        {
            presentable.position = position;
            self.emit_changed(&volume);
        }

        let placement = self.placement_for(record);
        self.set_enclosing(&volume, placement.enclosing);
        if placement.settled {
            self.deferred.remove(&record.id);
        } else {
            self.defer(&record.id);
        }
    }

    /// Re-place the logical partitions of `drive` after its extended
    /// partition appeared or went away.
    pub(super) fn replace_logical_volumes(&mut self, drive: &str) {
        let logical: Vec<DeviceRecord> = self
            .volumes
            .keys()
            .filter_map(|device| self.registry.get(device))
            .filter(|record| {
                record.partition_slave() == Some(drive)
                    && record.partition.as_ref().is_some_and(|p| p.is_logical())
            })
            .cloned()
            .collect();
        for record in logical {
            self.replace_volume(&record);
        }
    }

    fn partition_offset(&self, device: &str) -> Option<u64> {
        self.registry
            .get(device)
            .and_then(|record| record.partition.as_ref())
            .map(|partition| partition.offset)
    }

    /// The presentable a device's volume should hang under.
    pub(super) fn placement_for(&self, record: &DeviceRecord) -> Placement {
        if let Some(partition) = &record.partition {
            let drive = self.drives.get(&partition.slave).cloned();
            if partition.is_logical() {
                if let Some(extended) = self.extended_volume_on(&partition.slave) {
                    return Placement {
                        enclosing: Some(extended),
                        settled: true,
                    };
                }
                return Placement {
                    enclosing: drive,
                    settled: false,
                };
            }
            return Placement {
                settled: drive.is_some(),
                enclosing: drive,
            };
        }

        let parent = match &record.crypto_cleartext_slave {
            Some(slave) => self.volumes.get(slave),
            None => self.drives.get(&record.id),
        };
        Placement {
            settled: parent.is_some(),
            enclosing: parent.cloned(),
        }
    }

    /// The extended-partition volume of `drive`, looking only at that drive.
    fn extended_volume_on(&self, drive: &str) -> Option<PresentableId> {
        self.volumes
            .iter()
            .filter(|(device, _)| {
                self.registry.get(device).is_some_and(|record| {
                    record.partition_slave() == Some(drive) && record.is_extended_partition()
                })
            })
            .map(|(_, volume)| volume)
            .min()
            .cloned()
    }

    /// Retry every deferred device until nothing moves any more.
    pub(super) fn resolve_deferred(&mut self) {
        if !self.config.resolve_deferred {
            return;
        }

        loop {
            let mut progressed = false;
            let pending: Vec<String> = self.deferred.iter().cloned().collect();

            for device in pending {
                let Some(record) = self.registry.get(&device).cloned() else {
                    self.deferred.remove(&device);
                    progressed = true;
                    continue;
                };
                let placement = self.placement_for(&record);

                match self.volumes.get(&device).cloned() {
                    Some(volume) => {
                        let before = self.presentables.get(&volume).map(|p| p.enclosing.clone());
                        self.set_enclosing(&volume, placement.enclosing.clone());
                        if before != Some(placement.enclosing.clone()) {
                            progressed = true;
                        }
                    }
                    None if record.is_crypto_cleartext() => {
                        if let Some(enclosing) = placement.enclosing.clone() {
                            self.add_volume(&device, Some(enclosing));
                            progressed = true;
                        }
                    }
                    None => {}
                }

                if placement.settled {
                    debug!(device = %device, "Deferred placement resolved");
                    self.deferred.remove(&device);
                    progressed = true;
                }
            }

            if !progressed {
                break;
            }
        }
    }
}
