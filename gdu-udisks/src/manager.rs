// SPDX-License-Identifier: GPL-3.0-only

//! Connection to the daemon and its change signals

use std::collections::HashMap;

use futures::StreamExt;
use futures::stream::Stream;
use futures::task::{Context, Poll};
use gdu_pool::DeviceEvent;
use gdu_types::JobState;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use zbus::fdo::ObjectManagerProxy;
use zbus::zvariant::{self, OwnedValue, Value};
use zbus::{Connection, MatchRule, MessageStream, message};
use zbus_macros::proxy;

use crate::error::DiskError;
use crate::operations::UDisksBackend;
use crate::properties::{
    BLOCK_IFACE, JOB_IFACE, ObjectMap, dependent_blocks, job_objects, job_state, object_map,
};
use crate::source::UDisksSource;
use crate::values::PropertyMap;

pub const UDISKS_SERVICE: &str = "org.freedesktop.UDisks2";
pub const UDISKS_ROOT: &str = "/org/freedesktop/UDisks2";
const BLOCK_PREFIX: &str = "/org/freedesktop/UDisks2/block_devices/";

#[proxy(
    default_service = "org.freedesktop.UDisks2",
    default_path = "/org/freedesktop/UDisks2/Manager",
    interface = "org.freedesktop.UDisks2.Manager"
)]
pub trait UDisks2Manager {
    fn get_block_devices(
        &self,
        options: HashMap<String, Value<'_>>,
    ) -> zbus::Result<Vec<zvariant::OwnedObjectPath>>;

    fn can_format(&self, type_: &str) -> zbus::Result<(bool, String)>;

    fn can_check(&self, type_: &str) -> zbus::Result<(bool, String)>;

    #[zbus(property)]
    fn version(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn supported_filesystems(&self) -> zbus::Result<Vec<String>>;

    #[zbus(property)]
    fn supported_encryption_types(&self) -> zbus::Result<Vec<String>>;
}

#[proxy(
    default_service = "org.freedesktop.UDisks2",
    default_path = "/org/freedesktop/UDisks2",
    interface = "org.freedesktop.DBus.ObjectManager"
)]
pub trait UDisks2ObjectManager {
    #[zbus(signal)]
    fn interfaces_added(
        &self,
        object_path: zvariant::OwnedObjectPath,
        interfaces_and_properties: HashMap<String, HashMap<String, zvariant::OwnedValue>>,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    fn interfaces_removed(
        &self,
        object_path: zvariant::OwnedObjectPath,
        interfaces: Vec<String>,
    ) -> zbus::Result<()>;
}

/// Snapshot of every object the daemon manages.
pub async fn managed_objects(connection: &Connection) -> Result<ObjectMap, DiskError> {
    let proxy = ObjectManagerProxy::builder(connection)
        .destination(UDISKS_SERVICE)?
        .path(UDISKS_ROOT)?
        .build()
        .await?;
    Ok(object_map(proxy.get_managed_objects().await?))
}

pub struct DiskManager {
    connection: Connection,
}

pub struct DeviceEventStream {
    receiver: mpsc::Receiver<DeviceEvent>,
}

impl DiskManager {
    pub async fn new() -> Result<Self, DiskError> {
        let connection = Connection::system()
            .await
            .map_err(|e| DiskError::ConnectionFailed(e.to_string()))?;
        Ok(Self { connection })
    }

    /// Get a reference to the D-Bus connection
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn source(&self) -> UDisksSource {
        UDisksSource::new(self.connection.clone())
    }

    pub fn backend(&self) -> UDisksBackend {
        UDisksBackend::new(self.connection.clone())
    }

    /// A signal-based event stream for the device pool.
    ///
    /// `InterfacesAdded`/`InterfacesRemoved` of the Block interface become
    /// Added/Removed and of any other interface on a block become Changed.
    /// `PropertiesChanged` becomes Changed for every block whose
    /// record depends on the object, and Job objects become JobChanged for each
    /// object the job covers.
    pub async fn device_event_stream(&self) -> Result<DeviceEventStream, DiskError> {
        let (sender, receiver) = mpsc::channel(32);
        let connection = self.connection.clone();

        let object_manager = UDisks2ObjectManagerProxy::new(&connection).await?;
        let mut added_stream = object_manager.receive_interfaces_added().await?;
        let mut removed_stream = object_manager.receive_interfaces_removed().await?;

        let rule = MatchRule::builder()
            .msg_type(message::Type::Signal)
            .sender(UDISKS_SERVICE)?
            .interface("org.freedesktop.DBus.Properties")?
            .member("PropertiesChanged")?
            .path_namespace(UDISKS_ROOT)?
            .build();
        let mut changed_stream = MessageStream::for_match_rule(rule, &connection, Some(64)).await?;

        let mut pump = EventPump {
            connection,
            sender,
            jobs: HashMap::new(),
        };
        pump.seed_jobs().await;

        tokio::spawn(async move {
            loop {
                let delivered = tokio::select! {
                    maybe_added = added_stream.next() => {
                        let Some(signal) = maybe_added else {
                            break;
                        };
                        match signal.args() {
                            Ok(args) => {
                                pump.interfaces_added(
                                    args.object_path.as_str(),
                                    &args.interfaces_and_properties,
                                )
                                .await
                            }
                            Err(e) => {
                                warn!("Failed to parse InterfacesAdded signal args: {e}");
                                true
                            }
                        }
                    }
                    maybe_removed = removed_stream.next() => {
                        let Some(signal) = maybe_removed else {
                            break;
                        };
                        match signal.args() {
                            Ok(args) => {
                                pump.interfaces_removed(args.object_path.as_str(), &args.interfaces)
                                    .await
                            }
                            Err(e) => {
                                warn!("Failed to parse InterfacesRemoved signal args: {e}");
                                true
                            }
                        }
                    }
                    maybe_changed = changed_stream.next() => {
                        let Some(message) = maybe_changed else {
                            break;
                        };
                        match message {
                            Ok(message) => pump.properties_changed(&message).await,
                            Err(e) => {
                                warn!("Failed to read PropertiesChanged signal: {e}");
                                true
                            }
                        }
                    }
                };

                if !delivered {
                    warn!("Device event receiver dropped");
                    break;
                }
            }
            debug!("Device event pump stopped");
        });

        Ok(DeviceEventStream { receiver })
    }
}

/// Turns daemon signals into [`DeviceEvent`]s. Each handler returns false
/// once the receiving side is gone.
struct EventPump {
    connection: Connection,
    sender: mpsc::Sender<DeviceEvent>,
    /// Last known properties of every running job
    jobs: HashMap<String, PropertyMap>,
}

impl EventPump {
    async fn send(&self, event: DeviceEvent) -> bool {
        self.sender.send(event).await.is_ok()
    }

    /// Jobs already running when the stream starts.
    async fn seed_jobs(&mut self) {
        match managed_objects(&self.connection).await {
            Ok(objects) => {
                for (path, interfaces) in objects {
                    if let Some(job) = interfaces.get(JOB_IFACE) {
                        self.jobs.insert(path, job.clone());
                    }
                }
            }
            Err(e) => warn!("Failed to read running jobs: {e}"),
        }
    }

    async fn interfaces_added(
        &mut self,
        path: &str,
        interfaces: &HashMap<String, HashMap<String, OwnedValue>>,
    ) -> bool {
        if let Some(event) = interfaces_added_event(path, interfaces.keys().map(String::as_str))
            && !self.send(event).await
        {
            return false;
        }
        if let Some(job) = interfaces.get(JOB_IFACE) {
            self.jobs.insert(path.to_string(), job.clone());
            return self.announce_job(job, job_state(job)).await;
        }
        true
    }

    async fn interfaces_removed(&mut self, path: &str, interfaces: &[String]) -> bool {
        if let Some(event) = interfaces_removed_event(path, interfaces.iter().map(String::as_str))
            && !self.send(event).await
        {
            return false;
        }
        if interfaces.iter().any(|i| i == JOB_IFACE)
            && let Some(job) = self.jobs.remove(path)
        {
            return self.announce_job(&job, JobState::idle()).await;
        }
        true
    }

    async fn properties_changed(&mut self, message: &zbus::Message) -> bool {
        let header = message.header();
        let Some(path) = header.path().map(|p| p.to_string()) else {
            return true;
        };
        let body = message.body();
        let (interface, changed, _invalidated) =
            match body.deserialize::<(String, HashMap<String, OwnedValue>, Vec<String>)>() {
                Ok(args) => args,
                Err(e) => {
                    warn!("Failed to parse PropertiesChanged on {path}: {e}");
                    return true;
                }
            };

        if interface == JOB_IFACE {
            let Some(job) = self.jobs.get_mut(&path) else {
                return true;
            };
            job.extend(changed);
            let job = job.clone();
            return self.announce_job(&job, job_state(&job)).await;
        }

        if path.starts_with(BLOCK_PREFIX) {
            return self.send(DeviceEvent::Changed(path)).await;
        }

        // Drive and array objects feed into the records of their blocks.
        let blocks = match managed_objects(&self.connection).await {
            Ok(objects) => dependent_blocks(&path, &objects),
            Err(e) => {
                warn!("Failed to resolve blocks depending on {path}: {e}");
                return true;
            }
        };
        for block in blocks {
            if !self.send(DeviceEvent::Changed(block)).await {
                return false;
            }
        }
        true
    }

    async fn announce_job(&self, job: &PropertyMap, state: JobState) -> bool {
        for object in job_objects(job) {
            if !self.send(DeviceEvent::JobChanged(object, state.clone())).await {
                return false;
            }
        }
        true
    }
}

/// A new Block object is a new device. Other interfaces appearing on a block,
/// such as a partition table after formatting, change the existing device.
fn interfaces_added_event<'a>(
    path: &str,
    mut interfaces: impl Iterator<Item = &'a str>,
) -> Option<DeviceEvent> {
    if interfaces.any(|i| i == BLOCK_IFACE) {
        Some(DeviceEvent::Added(path.to_string()))
    } else if path.starts_with(BLOCK_PREFIX) {
        Some(DeviceEvent::Changed(path.to_string()))
    } else {
        None
    }
}

fn interfaces_removed_event<'a>(
    path: &str,
    mut interfaces: impl Iterator<Item = &'a str>,
) -> Option<DeviceEvent> {
    if interfaces.any(|i| i == BLOCK_IFACE) {
        Some(DeviceEvent::Removed(path.to_string()))
    } else if path.starts_with(BLOCK_PREFIX) {
        Some(DeviceEvent::Changed(path.to_string()))
    } else {
        None
    }
}

impl Stream for DeviceEventStream {
    type Item = DeviceEvent;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
