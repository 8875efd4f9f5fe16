use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::BoxFuture;
use gdu_pool::{
    DeviceSource, OperationBackend, OperationResult, Pool, PoolConfig, PoolEvent, PoolListener,
    Presentable, PresentableId, SourceError,
};
use gdu_types::{
    DaemonInfo, DeviceRecord, DriveInfo, MdArrayInfo, MdComponentInfo, Operation,
    OperationOutput, PartitionInfo, PartitionScheme, PartitionTableInfo,
};

pub const GIB: u64 = 1024 * 1024 * 1024;

/// In-memory daemon: records keyed by id, with injectable fetch failures.
#[derive(Default)]
pub struct FakeSource {
    records: Mutex<HashMap<String, DeviceRecord>>,
    failing: Mutex<HashSet<String>>,
    daemon: Mutex<DaemonInfo>,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, record: DeviceRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    pub fn forget(&self, id: &str) {
        self.records.lock().unwrap().remove(id);
    }

    pub fn fail(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn heal(&self, id: &str) {
        self.failing.lock().unwrap().remove(id);
    }

    pub fn set_daemon(&self, info: DaemonInfo) {
        *self.daemon.lock().unwrap() = info;
    }
}

#[async_trait]
impl DeviceSource for FakeSource {
    async fn fetch_properties(&self, id: &str) -> Result<DeviceRecord, SourceError> {
        if self.failing.lock().unwrap().contains(id) {
            return Err(SourceError::Unavailable(format!("fetch of {id} failed")));
        }
        self.records
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(id.to_string()))
    }

    async fn enumerate_all(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.records.lock().unwrap().keys().cloned().collect())
    }

    async fn daemon_info(&self) -> Result<DaemonInfo, SourceError> {
        Ok(self.daemon.lock().unwrap().clone())
    }
}

/// Listener that keeps every notification for later inspection.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<PoolEvent>>>,
}

impl Recorder {
    pub fn take(&self) -> Vec<PoolEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn events(&self) -> Vec<PoolEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn removals_of(&self, id: &PresentableId) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| matches!(event, PoolEvent::PresentableRemoved(p) if p.id() == id))
            .count()
    }

    pub fn additions_of(&self, id: &PresentableId) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| matches!(event, PoolEvent::PresentableAdded(p) if p.id() == id))
            .count()
    }

    fn push(&self, event: PoolEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl PoolListener for Recorder {
    fn device_added(&mut self, id: &str) {
        self.push(PoolEvent::DeviceAdded(id.to_string()));
    }

    fn device_removed(&mut self, id: &str) {
        self.push(PoolEvent::DeviceRemoved(id.to_string()));
    }

    fn device_changed(&mut self, id: &str) {
        self.push(PoolEvent::DeviceChanged(id.to_string()));
    }

    fn device_job_changed(&mut self, id: &str) {
        self.push(PoolEvent::DeviceJobChanged(id.to_string()));
    }

    fn presentable_added(&mut self, presentable: &Presentable) {
        self.push(PoolEvent::PresentableAdded(presentable.clone()));
    }

    fn presentable_removed(&mut self, presentable: &Presentable) {
        self.push(PoolEvent::PresentableRemoved(presentable.clone()));
    }

    fn presentable_changed(&mut self, presentable: &Presentable) {
        self.push(PoolEvent::PresentableChanged(presentable.clone()));
    }

    fn presentable_job_changed(&mut self, presentable: &Presentable) {
        self.push(PoolEvent::PresentableJobChanged(presentable.clone()));
    }
}

pub fn new_pool(source: &Arc<FakeSource>) -> (Pool, Recorder) {
    pool_with_config(source, PoolConfig::default())
}

pub fn pool_with_config(source: &Arc<FakeSource>, config: PoolConfig) -> (Pool, Recorder) {
    let mut pool = Pool::new(source.clone(), config);
    let recorder = Recorder::default();
    pool.add_listener(Box::new(recorder.clone()));
    (pool, recorder)
}

/// Put `records` into the source and add them to the pool in order.
pub async fn add_all(pool: &mut Pool, source: &FakeSource, records: Vec<DeviceRecord>) {
    for record in records {
        let id = record.id.clone();
        source.put(record);
        pool.on_device_added(&id).await;
    }
}

// === Record builders ===

pub fn disk(id: &str, size: u64) -> DeviceRecord {
    let mut record = DeviceRecord::new(id);
    record.device_file = format!("/dev/{id}");
    record.size = size;
    record.block_size = 512;
    record.is_drive = true;
    record.is_media_available = true;
    record.drive = Some(DriveInfo {
        vendor: "ACME".to_string(),
        model: "Spinner 9000".to_string(),
        connection_interface: "ata".to_string(),
        ..Default::default()
    });
    record
}

/// `slots` are `(offset, size)` pairs indexed by entry slot; offset 0 marks a free slot.
pub fn partitioned(mut record: DeviceRecord, scheme: PartitionScheme, slots: &[(u64, u64)]) -> DeviceRecord {
    record.partition_table = Some(PartitionTableInfo {
        scheme: Some(scheme),
        count: slots.iter().filter(|(offset, _)| *offset != 0).count() as u32,
        max_number: slots.len() as u32,
        offsets: slots.iter().map(|(offset, _)| *offset).collect(),
        sizes: slots.iter().map(|(_, size)| *size).collect(),
    });
    record
}

pub fn partition(
    id: &str,
    slave: &str,
    scheme: PartitionScheme,
    number: u32,
    range: (u64, u64),
    type_code: &str,
) -> DeviceRecord {
    let mut record = DeviceRecord::new(id);
    record.device_file = format!("/dev/{id}");
    record.size = range.1;
    record.is_media_available = true;
    record.partition = Some(PartitionInfo {
        slave: slave.to_string(),
        scheme,
        number,
        type_code: type_code.to_string(),
        label: String::new(),
        uuid: String::new(),
        flags: Default::default(),
        offset: range.0,
        size: range.1,
    });
    record
}

pub fn md_component(mut record: DeviceRecord, uuid: &str) -> DeviceRecord {
    record.id_usage = "raid".to_string();
    record.id_type = "linux_raid_member".to_string();
    record.md_component = Some(MdComponentInfo {
        uuid: uuid.to_string(),
        name: "box:0".to_string(),
        level: "raid1".to_string(),
        num_raid_devices: 2,
    });
    record
}

pub fn component(id: &str, uuid: &str) -> DeviceRecord {
    let mut record = DeviceRecord::new(id);
    record.device_file = format!("/dev/{id}");
    record.size = GIB;
    md_component(record, uuid)
}

pub fn md_array(id: &str, uuid: Option<&str>, slaves: &[&str]) -> DeviceRecord {
    let mut record = DeviceRecord::new(id);
    record.device_file = format!("/dev/{id}");
    record.size = GIB;
    record.is_drive = true;
    record.is_media_available = true;
    record.md_array = Some(MdArrayInfo {
        uuid: uuid.map(str::to_string),
        level: "raid1".to_string(),
        num_raid_devices: slaves.len() as u32,
        slaves: slaves.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    });
    record
}

pub fn cleartext(id: &str, slave: &str) -> DeviceRecord {
    let mut record = DeviceRecord::new(id);
    record.device_file = format!("/dev/{id}");
    record.size = GIB;
    record.id_usage = "filesystem".to_string();
    record.id_type = "ext4".to_string();
    record.crypto_cleartext_slave = Some(slave.to_string());
    record
}

pub fn drive_id(device: &str) -> PresentableId {
    PresentableId::Drive(device.to_string())
}

pub fn volume_id(device: &str) -> PresentableId {
    PresentableId::Volume(device.to_string())
}

/// Backend that records every request and answers with a canned result.
#[derive(Clone)]
pub struct FakeBackend {
    calls: Arc<Mutex<Vec<Operation>>>,
    result: Arc<Mutex<OperationResult>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            calls: Arc::default(),
            result: Arc::new(Mutex::new(Ok(OperationOutput::Done))),
        }
    }
}

impl FakeBackend {
    pub fn set_result(&self, result: OperationResult) {
        *self.result.lock().unwrap() = result;
    }

    pub fn take_calls(&self) -> Vec<Operation> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

impl OperationBackend for FakeBackend {
    fn execute(&self, operation: Operation) -> BoxFuture<'_, OperationResult> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(operation);
            self.result.lock().unwrap().clone()
        })
    }
}
