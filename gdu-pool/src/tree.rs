// SPDX-License-Identifier: GPL-3.0-only

//! Tree view of the presentable graph

use std::collections::BTreeMap;
use std::fmt::Write;

use gdu_types::bytes_to_pretty;

use crate::notify::PoolEvent;
use crate::pool::Pool;
use crate::presentable::{Presentable, PresentableId, PresentableKind};

/// Read-only mirror of the pool, kept current by feeding it [`PoolEvent`]s.
///
/// Rows whose enclosing row is not present yet are shown at the root and
/// move under their parent once it arrives.
#[derive(Debug, Default)]
pub struct PresentableTree {
    rows: BTreeMap<PresentableId, Row>,
    selected: Option<PresentableId>,
}

#[derive(Debug, Clone)]
struct Row {
    parent: Option<PresentableId>,
    position: Option<u64>,
}

impl Row {
    fn of(presentable: &Presentable) -> Self {
        Self {
            parent: presentable.enclosing().cloned(),
            position: presentable.position(),
        }
    }
}

impl PresentableTree {
    pub fn from_pool(pool: &Pool) -> Self {
        let rows = pool
            .list_all()
            .into_iter()
            .map(|p| (p.id().clone(), Row::of(p)))
            .collect();
        Self {
            rows,
            selected: None,
        }
    }

    pub fn apply(&mut self, event: &PoolEvent) {
        match event {
            PoolEvent::PresentableAdded(p) | PoolEvent::PresentableChanged(p) => {
                self.rows.insert(p.id().clone(), Row::of(p));
            }
            PoolEvent::PresentableRemoved(p) => {
                self.rows.remove(p.id());
            }
            _ => {}
        }
    }

    pub fn contains(&self, id: &PresentableId) -> bool {
        self.rows.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn roots(&self) -> Vec<&PresentableId> {
        self.rows
            .iter()
            .filter(|(_, row)| {
                row.parent
                    .as_ref()
                    .is_none_or(|parent| !self.rows.contains_key(parent))
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Rows directly under `id`. Partitions and free space interleave by
    /// offset; unpositioned rows come first, by id.
    pub fn children(&self, id: &PresentableId) -> Vec<&PresentableId> {
        let mut children: Vec<(&PresentableId, &Row)> = self
            .rows
            .iter()
            .filter(|(_, row)| row.parent.as_ref() == Some(id))
            .collect();
        children.sort_by(|(a, a_row), (b, b_row)| (a_row.position, a).cmp(&(b_row.position, b)));
        children.into_iter().map(|(child, _)| child).collect()
    }

    /// Remember the selection by id; it survives the row being removed and
    /// added again.
    pub fn select(&mut self, id: PresentableId) {
        self.selected = Some(id);
    }

    pub fn selected(&self) -> Option<&PresentableId> {
        self.selected.as_ref().filter(|id| self.rows.contains_key(id))
    }

    pub fn render(&self, pool: &Pool) -> String {
        let mut out = String::new();
        for root in self.roots() {
            self.render_row(pool, root, 0, &mut out);
        }
        out
    }

    fn render_row(&self, pool: &Pool, id: &PresentableId, depth: usize, out: &mut String) {
        if let Some(presentable) = pool.get(id) {
            let marker = if self.selected() == Some(id) { "*" } else { " " };
            let _ = writeln!(
                out,
                "{marker}{:indent$}{}",
                "",
                title(pool, presentable),
                indent = depth * 2
            );
        }
        for child in self.children(id) {
            self.render_row(pool, child, depth + 1, out);
        }
    }
}

/// Display title of a presentable.
pub fn title(pool: &Pool, presentable: &Presentable) -> String {
    match presentable.kind() {
        PresentableKind::Drive { device } => {
            let Some(record) = pool.device(device) else {
                return device.clone();
            };
            let (vendor, model) = record
                .drive
                .as_ref()
                .map(|d| (d.vendor.as_str(), d.model.as_str()))
                .unwrap_or_default();
            let name = format!("{vendor} {model}");
            let name = name.trim();
            let name = if name.is_empty() { record.device_file.as_str() } else { name };
            if record.is_removable {
                name.to_string()
            } else {
                format!("{} {}", bytes_to_pretty(&record.size, false), name)
            }
        }
        PresentableKind::Volume { device } => {
            let Some(record) = pool.device(device) else {
                return device.clone();
            };
            let label = record
                .partition
                .as_ref()
                .map(|p| p.label.as_str())
                .filter(|label| !label.is_empty())
                .unwrap_or(record.id_label.as_str());
            if !label.is_empty() {
                return label.to_string();
            }
            let kind = if record.is_partition() { "Partition" } else { "Volume" };
            format!("{} {kind}", bytes_to_pretty(&record.size, false))
        }
        PresentableKind::VolumeHole { size, .. } => {
            format!("{} Free", bytes_to_pretty(size, false))
        }
        PresentableKind::ActivatableDrive(drive) => {
            let level = drive
                .device()
                .and_then(|device| pool.device(device))
                .and_then(|record| record.md_array.as_ref().map(|a| a.level.clone()))
                .or_else(|| {
                    drive
                        .slaves()
                        .iter()
                        .filter_map(|slave| pool.device(slave))
                        .find_map(|record| record.md_component.as_ref().map(|c| c.level.clone()))
                })
                .unwrap_or_default();
            match level.strip_prefix("raid") {
                Some(n) if !n.is_empty() => format!("RAID-{n} Array"),
                _ => "RAID Array".to_string(),
            }
        }
    }
}
