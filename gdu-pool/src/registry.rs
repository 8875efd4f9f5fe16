// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use gdu_types::{DeviceRecord, JobState};

use crate::error::{PoolError, Result};
use crate::source::DeviceSource;

/// Device id to current record. Records are replaced on refresh, never merged.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, DeviceRecord>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a fresh snapshot of `id` and store it, replacing any previous record.
    ///
    /// On failure the registry is left untouched.
    pub async fn upsert<S>(&mut self, id: &str, source: &S) -> Result<&DeviceRecord>
    where
        S: DeviceSource + ?Sized,
    {
        let mut record = source
            .fetch_properties(id)
            .await
            .map_err(|source| PoolError::Fetch {
                id: id.to_string(),
                source,
            })?;

        record
            .validate()
            .map_err(|reason| PoolError::InvalidRecord {
                id: id.to_string(),
                reason,
            })?;
        record.id = id.to_string();

        match self.devices.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.insert(record);
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => Ok(entry.insert(record)),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<DeviceRecord> {
        self.devices.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&DeviceRecord> {
        self.devices.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.devices.contains_key(id)
    }

    /// All records, ordered by id.
    pub fn all(&self) -> Vec<&DeviceRecord> {
        let mut records: Vec<_> = self.devices.values().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// Replace only the job state of a known device.
    pub fn set_job(&mut self, id: &str, job: JobState) -> Option<&DeviceRecord> {
        let record = self.devices.get_mut(id)?;
        record.job = job;
        Some(record)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use gdu_types::{DaemonInfo, DriveInfo, PartitionInfo, PartitionScheme};

    use super::*;
    use crate::error::SourceError;

    #[derive(Default)]
    struct StubSource {
        records: Mutex<HashMap<String, DeviceRecord>>,
    }

    impl StubSource {
        fn put(&self, record: DeviceRecord) {
            self.records
                .lock()
                .unwrap()
                .insert(record.id.clone(), record);
        }
    }

    #[async_trait]
    impl DeviceSource for StubSource {
        async fn fetch_properties(&self, id: &str) -> std::result::Result<DeviceRecord, SourceError> {
            self.records
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| SourceError::NotFound(id.to_string()))
        }

        async fn enumerate_all(&self) -> std::result::Result<Vec<String>, SourceError> {
            Ok(self.records.lock().unwrap().keys().cloned().collect())
        }

        async fn daemon_info(&self) -> std::result::Result<DaemonInfo, SourceError> {
            Ok(DaemonInfo::default())
        }
    }

    fn drive(id: &str, vendor: &str) -> DeviceRecord {
        let mut record = DeviceRecord::new(id);
        record.is_drive = true;
        record.drive = Some(DriveInfo {
            vendor: vendor.to_string(),
            ..Default::default()
        });
        record
    }

    #[tokio::test]
    async fn upsert_replaces_instead_of_merging() {
        let source = StubSource::default();
        let mut first = drive("sda", "ACME");
        first.id_label = "old".to_string();
        source.put(first);

        let mut registry = DeviceRegistry::new();
        registry.upsert("sda", &source).await.expect("first upsert");

        source.put(drive("sda", "Initech"));
        let record = registry.upsert("sda", &source).await.expect("second upsert");
        assert_eq!(record.drive.as_ref().map(|d| d.vendor.as_str()), Some("Initech"));
        assert_eq!(record.id_label, "");
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_record() {
        let source = StubSource::default();
        source.put(drive("sda", "ACME"));

        let mut registry = DeviceRegistry::new();
        registry.upsert("sda", &source).await.expect("upsert");

        source.records.lock().unwrap().clear();
        let err = registry.upsert("sda", &source).await.unwrap_err();
        assert!(matches!(err, PoolError::Fetch { .. }));
        assert!(registry.contains("sda"));
    }

    #[tokio::test]
    async fn rejects_drive_that_is_also_a_partition() {
        let source = StubSource::default();
        let mut record = drive("sda1", "ACME");
        record.partition = Some(PartitionInfo {
            slave: "sda".to_string(),
            scheme: PartitionScheme::Gpt,
            number: 1,
            type_code: String::new(),
            label: String::new(),
            uuid: String::new(),
            flags: Default::default(),
            offset: 0,
            size: 0,
        });
        source.put(record);

        let mut registry = DeviceRegistry::new();
        let err = registry.upsert("sda1", &source).await.unwrap_err();
        assert!(matches!(err, PoolError::InvalidRecord { .. }));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn set_job_touches_only_the_job() {
        let source = StubSource::default();
        source.put(drive("sda", "ACME"));

        let mut registry = DeviceRegistry::new();
        registry.upsert("sda", &source).await.expect("upsert");

        let job = JobState {
            in_progress: true,
            id: "format-mkfs".to_string(),
            ..Default::default()
        };
        let record = registry.set_job("sda", job.clone()).expect("known device");
        assert_eq!(record.job, job);
        assert_eq!(record.drive.as_ref().map(|d| d.vendor.as_str()), Some("ACME"));
        assert!(registry.set_job("sdz", job).is_none());
    }
}
