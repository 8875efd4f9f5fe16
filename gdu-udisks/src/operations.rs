// SPDX-License-Identifier: GPL-3.0-only

//! Mutation requests issued as daemon method calls

use std::collections::HashMap;

use futures::future::BoxFuture;
use gdu_pool::{OperationBackend, OperationError, OperationResult};
use gdu_types::{Operation, OperationOutput, PartitionScheme};
use tracing::{debug, info};
use udisks2::{
    block::BlockProxy, encrypted::EncryptedProxy, filesystem::FilesystemProxy,
    partition::PartitionProxy, partitiontable::PartitionTableProxy,
};
use zbus::Connection;
use zbus::zvariant::{ObjectPath, OwnedObjectPath, Value};

use crate::error::DiskError;
use crate::manager::{UDISKS_SERVICE, managed_objects};
use crate::properties::{
    BLOCK_IFACE, DRIVE_ATA_IFACE, JOB_IFACE, MDRAID_IFACE, PARTITION_IFACE,
    PARTITION_TABLE_IFACE, array_block, job_objects, raw_partition_flags,
};

type Options<'a> = HashMap<&'a str, Value<'a>>;

/// [`OperationBackend`] talking to UDisks2.
#[derive(Clone)]
pub struct UDisksBackend {
    connection: Connection,
}

impl UDisksBackend {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    async fn raw_proxy(
        &self,
        path: &str,
        interface: &'static str,
    ) -> Result<zbus::Proxy<'static>, DiskError> {
        let path = object_path(path)?.into_owned();
        Ok(zbus::Proxy::new(&self.connection, UDISKS_SERVICE, path, interface).await?)
    }

    /// An object-path property, `None` for the daemon's `/` placeholder.
    async fn path_property(
        &self,
        path: &str,
        interface: &'static str,
        name: &str,
    ) -> Result<Option<String>, DiskError> {
        let proxy = self.raw_proxy(path, interface).await?;
        let value: OwnedObjectPath = proxy.get_property(name).await?;
        Ok(Some(value.to_string()).filter(|p| p != "/"))
    }

    async fn require_path_property(
        &self,
        device: &str,
        interface: &'static str,
        name: &str,
    ) -> Result<String, DiskError> {
        self.path_property(device, interface, name)
            .await?
            .ok_or_else(|| DiskError::OperationFailed(format!("{device} has no {name}")))
    }

    async fn run(&self, operation: Operation) -> Result<OperationOutput, DiskError> {
        let conn = &self.connection;
        match operation {
            Operation::FilesystemCreate {
                device,
                fstype,
                label,
                erase,
                passphrase,
            } => {
                let proxy = BlockProxy::builder(conn).path(device.as_str())?.build().await?;
                let mut options = Options::new();
                if let Some(label) = label.as_deref()
                    && !label.is_empty()
                {
                    options.insert("label", Value::from(label));
                }
                if erase {
                    options.insert("erase", Value::from("zero"));
                }
                if let Some(passphrase) = &passphrase {
                    options.insert("encrypt.passphrase", Value::from(passphrase.expose()));
                }
                proxy.format(fstype.as_str(), options).await?;
                Ok(OperationOutput::Done)
            }
            Operation::FilesystemSetLabel { device, label } => {
                let proxy = FilesystemProxy::builder(conn)
                    .path(device.as_str())?
                    .build()
                    .await?;
                proxy.set_label(label.as_str(), Options::new()).await?;
                Ok(OperationOutput::Done)
            }
            Operation::Mount { device, options } => {
                let proxy = FilesystemProxy::builder(conn)
                    .path(device.as_str())?
                    .build()
                    .await?;
                let mut opts = Options::new();
                if let Some(options) = options.as_deref()
                    && !options.is_empty()
                {
                    opts.insert("options", Value::from(options));
                }
                let mount_path = proxy.mount(opts).await?;
                Ok(OperationOutput::MountPath(mount_path))
            }
            Operation::Unmount { device, force } => {
                let proxy = FilesystemProxy::builder(conn)
                    .path(device.as_str())?
                    .build()
                    .await?;
                let mut opts = Options::new();
                if force {
                    opts.insert("force", Value::from(true));
                }
                proxy.unmount(opts).await?;
                Ok(OperationOutput::Done)
            }
            Operation::PartitionCreate {
                device,
                offset,
                size,
                type_code,
                name,
            } => {
                let proxy = PartitionTableProxy::builder(conn)
                    .path(device.as_str())?
                    .build()
                    .await?;
                let created = proxy
                    .create_partition(offset, size, type_code.as_str(), name.as_str(), Options::new())
                    .await?;
                Ok(OperationOutput::CreatedDevice(created.to_string()))
            }
            Operation::PartitionDelete { device } => {
                let proxy = PartitionProxy::builder(conn)
                    .path(device.as_str())?
                    .build()
                    .await?;
                proxy.delete(Options::new()).await?;
                Ok(OperationOutput::Done)
            }
            Operation::PartitionModify {
                device,
                type_code,
                label,
                flags,
            } => {
                let proxy = PartitionProxy::builder(conn)
                    .path(device.as_str())?
                    .build()
                    .await?;
                if let Some(type_code) = &type_code {
                    proxy.set_type(type_code.as_str(), Options::new()).await?;
                }
                if let Some(label) = &label {
                    proxy.set_name(label.as_str(), Options::new()).await?;
                }
                if let Some(flags) = flags {
                    let table = self
                        .require_path_property(&device, PARTITION_IFACE, "Table")
                        .await?;
                    let kind: String = self
                        .raw_proxy(&table, PARTITION_TABLE_IFACE)
                        .await?
                        .get_property("Type")
                        .await?;
                    let raw = raw_partition_flags(&PartitionScheme::parse(&kind), flags);
                    proxy.set_flags(raw, Options::new()).await?;
                }
                Ok(OperationOutput::Done)
            }
            Operation::TableCreate {
                device,
                scheme,
                erase,
            } => {
                let kind = match scheme {
                    PartitionScheme::Mbr => "dos",
                    PartitionScheme::Gpt => "gpt",
                    other => {
                        return Err(DiskError::OperationFailed(format!(
                            "Cannot create a {} partition table",
                            other.as_str()
                        )));
                    }
                };
                let proxy = BlockProxy::builder(conn).path(device.as_str())?.build().await?;
                let mut options = Options::new();
                if erase {
                    options.insert("erase", Value::from("zero"));
                }
                proxy.format(kind, options).await?;
                Ok(OperationOutput::Done)
            }
            Operation::EncryptedUnlock { device, passphrase } => {
                let proxy = EncryptedProxy::builder(conn)
                    .path(device.as_str())?
                    .build()
                    .await?;
                let cleartext = proxy.unlock(passphrase.expose(), Options::new()).await?;
                Ok(OperationOutput::CleartextDevice(cleartext.to_string()))
            }
            Operation::EncryptedLock { device } => {
                let proxy = EncryptedProxy::builder(conn)
                    .path(device.as_str())?
                    .build()
                    .await?;
                proxy.lock(Options::new()).await?;
                Ok(OperationOutput::Done)
            }
            Operation::EncryptedChangePassphrase { device, old, new } => {
                let proxy = EncryptedProxy::builder(conn)
                    .path(device.as_str())?
                    .build()
                    .await?;
                proxy
                    .change_passphrase(old.expose(), new.expose(), Options::new())
                    .await?;
                Ok(OperationOutput::Done)
            }
            Operation::MdStart { components } => self.md_start(&components).await,
            Operation::MdStop { device } => {
                let array = self.require_path_property(&device, BLOCK_IFACE, "MDRaid").await?;
                let proxy = self.raw_proxy(&array, MDRAID_IFACE).await?;
                let _: () = proxy.call("Stop", &(Options::new(),)).await?;
                Ok(OperationOutput::Done)
            }
            Operation::MdAddComponent { device, component } => {
                let array = self.require_path_property(&device, BLOCK_IFACE, "MDRaid").await?;
                let proxy = self.raw_proxy(&array, MDRAID_IFACE).await?;
                let _: () = proxy
                    .call("AddDevice", &(object_path(&component)?, Options::new()))
                    .await?;
                Ok(OperationOutput::Done)
            }
            Operation::MdRemoveComponent { device, component } => {
                let array = self.require_path_property(&device, BLOCK_IFACE, "MDRaid").await?;
                let proxy = self.raw_proxy(&array, MDRAID_IFACE).await?;
                let mut options = Options::new();
                options.insert("wipe", Value::from(true));
                let _: () = proxy
                    .call("RemoveDevice", &(object_path(&component)?, options))
                    .await?;
                Ok(OperationOutput::Done)
            }
            Operation::CancelJob { device } => {
                let objects = managed_objects(conn).await?;
                let job = objects
                    .iter()
                    .find(|(_, interfaces)| {
                        interfaces
                            .get(JOB_IFACE)
                            .is_some_and(|job| job_objects(job).contains(&device))
                    })
                    .map(|(path, _)| path.clone())
                    .ok_or_else(|| DiskError::OperationFailed(format!("No job running on {device}")))?;
                let proxy = self.raw_proxy(&job, JOB_IFACE).await?;
                let _: () = proxy.call("Cancel", &(Options::new(),)).await?;
                info!(job, device, "Job cancelled");
                Ok(OperationOutput::Done)
            }
            Operation::SmartRefresh { device } => {
                let drive = self.require_path_property(&device, BLOCK_IFACE, "Drive").await?;
                let proxy = self.raw_proxy(&drive, DRIVE_ATA_IFACE).await?;
                let _: () = proxy.call("SmartUpdate", &(Options::new(),)).await?;
                Ok(OperationOutput::Done)
            }
            Operation::SmartSelftest { device, kind } => {
                let drive = self.require_path_property(&device, BLOCK_IFACE, "Drive").await?;
                let proxy = self.raw_proxy(&drive, DRIVE_ATA_IFACE).await?;
                let _: () = proxy
                    .call("SmartSelftestStart", &(kind.as_udisks_str(), Options::new()))
                    .await?;
                Ok(OperationOutput::Done)
            }
        }
    }

    /// Start the array every component belongs to and report the block
    /// device it runs as.
    async fn md_start(&self, components: &[String]) -> Result<OperationOutput, DiskError> {
        let mut array = None;
        for component in components {
            let member_of = self
                .require_path_property(component, BLOCK_IFACE, "MDRaidMember")
                .await?;
            match &array {
                None => array = Some(member_of),
                Some(first) if *first != member_of => {
                    return Err(DiskError::OperationFailed(format!(
                        "{component} belongs to {member_of}, not {first}"
                    )));
                }
                Some(_) => {}
            }
        }
        let array = array
            .ok_or_else(|| DiskError::OperationFailed("No components given".to_string()))?;

        let proxy = self.raw_proxy(&array, MDRAID_IFACE).await?;
        let mut options = Options::new();
        options.insert("start-degraded", Value::from(true));
        let _: () = proxy.call("Start", &(options,)).await?;

        let objects = managed_objects(&self.connection).await?;
        let block = array_block(&array, &objects).ok_or_else(|| {
            DiskError::DeviceNotFound(format!("{array} started without a block device"))
        })?;
        debug!(%array, %block, "RAID array started");
        Ok(OperationOutput::AssembledArray(block))
    }
}

fn object_path(id: &str) -> Result<ObjectPath<'_>, DiskError> {
    ObjectPath::try_from(id).map_err(|e| DiskError::DeviceNotFound(format!("{id}: {e}")))
}

impl OperationBackend for UDisksBackend {
    fn execute(&self, operation: Operation) -> BoxFuture<'_, OperationResult> {
        Box::pin(async move {
            let name = operation.name();
            debug!(operation = name, "Calling daemon");
            self.run(operation).await.map_err(OperationError::from)
        })
    }
}
