//! File (NFS) volume provisioner
//!
//! Provisions a targetd filesystem volume and one NFS export per host.
//! `fs_create` returns no identifier, so the created volume's path and
//! unique id are recovered by listing all volumes and scanning for the
//! (pool, name) pair. Export creation is best-effort per host; delete is
//! idempotent under repeated invocation, with "already absent" remote
//! errors treated as success.

use crate::backends::volume_group;
use crate::domain::ports::{
    AccessMode, NfsVolumeSource, ProvisionRequest, VolumeProvisioner, VolumeRecord, VolumeSource,
};
use crate::error::{Error, Result};
use crate::targetd::{ErrorCode, RpcTransport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

// Annotation keys consumed by delete. The remote volume's unique id is
// resolved once at create time; delete relies solely on the stored id.
pub const ANNOTATION_UUID: &str = "uuid";
pub const ANNOTATION_HOSTS: &str = "hosts";

const ACCESS_MODES: &[AccessMode] = &[
    AccessMode::ReadWriteMany,
    AccessMode::ReadOnlyMany,
    AccessMode::ReadWriteOnce,
];

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct FsCreateArgs<'a> {
    pool_name: &'a str,
    name: &'a str,
    size_bytes: u64,
}

#[derive(Debug, Serialize)]
struct FsDestroyArgs<'a> {
    uuid: &'a str,
}

#[derive(Debug, Serialize)]
struct NfsExportAddArgs<'a> {
    host: &'a str,
    path: &'a str,
    options: &'a [String],
}

#[derive(Debug, Serialize)]
struct NfsExportRemoveArgs<'a> {
    host: &'a str,
    path: &'a str,
}

/// One filesystem volume row from fs_list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsVolume {
    pub name: String,
    pub uuid: String,
    pub total_space: u64,
    pub free_space: u64,
    pub pool: String,
    pub full_path: String,
}

// =============================================================================
// NFS Provisioner
// =============================================================================

/// Provisioner for file volumes exported over NFS
pub struct NfsProvisioner {
    rpc: Arc<dyn RpcTransport>,
}

impl NfsProvisioner {
    /// Create a new NFS provisioner
    pub fn new(rpc: Arc<dyn RpcTransport>) -> Self {
        Self { rpc }
    }

    /// Run the create sequence: create the filesystem volume, resolve
    /// its path and unique id, then export it to each host in list
    /// order. A failing export is logged and skipped. Returns
    /// (full path, uuid).
    async fn create_volume(&self, request: &ProvisionRequest) -> Result<(String, String)> {
        let vol = &request.name;
        let pool = volume_group(request);
        let hosts = hosts(request);
        let options = nfs_options(request);

        debug!(name = %vol, pool = %pool, "creating volume");
        self.fs_create(vol, &pool).await?;

        let (path, uuid) = self.fs_find(vol, &pool).await?;
        debug!(name = %vol, pool = %pool, path = %path, "created volume");

        for host in &hosts {
            debug!(name = %vol, host = %host, "exporting volume");
            if let Err(err) = self.export_create(&path, host, &options).await {
                warn!(host = %host, error = %err, "failed to create export");
            }
        }

        Ok((path, uuid))
    }

    /// Resolve a created volume's full path and unique id by scanning
    /// the daemon's volume list for the (pool, name) pair.
    async fn fs_find(&self, name: &str, pool: &str) -> Result<(String, String)> {
        let volumes = match self.fs_list().await {
            Ok(volumes) => volumes,
            Err(err) => {
                warn!(error = %err, "failed to get volumes");
                Vec::new()
            }
        };
        for volume in volumes {
            if volume.pool == pool && volume.name == name {
                return Ok((volume.full_path, volume.uuid));
            }
        }
        Err(Error::CreatedVolumeNotFound)
    }

    async fn fs_create(&self, name: &str, pool: &str) -> Result<()> {
        let args = FsCreateArgs {
            pool_name: pool,
            name,
            size_bytes: 0,
        };
        self.rpc
            .call("fs_create", serde_json::to_value(&args)?)
            .await?;
        Ok(())
    }

    async fn fs_destroy(&self, uuid: &str) -> Result<()> {
        let args = FsDestroyArgs { uuid };
        self.rpc
            .call("fs_destroy", serde_json::to_value(&args)?)
            .await?;
        Ok(())
    }

    async fn fs_list(&self) -> Result<Vec<FsVolume>> {
        let result = self.rpc.call("fs_list", Value::Null).await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(result)?)
    }

    async fn export_create(&self, path: &str, host: &str, options: &[String]) -> Result<()> {
        let args = NfsExportAddArgs {
            host,
            path,
            options,
        };
        self.rpc
            .call("nfs_export_add", serde_json::to_value(&args)?)
            .await?;
        Ok(())
    }

    async fn export_destroy(&self, host: &str, path: &str) -> Result<()> {
        let args = NfsExportRemoveArgs { host, path };
        self.rpc
            .call("nfs_export_remove", serde_json::to_value(&args)?)
            .await?;
        Ok(())
    }
}

fn hosts(request: &ProvisionRequest) -> Vec<String> {
    request
        .parameter("hosts")
        .split(',')
        .map(str::to_string)
        .collect()
}

fn nfs_options(request: &ProvisionRequest) -> Vec<String> {
    request
        .parameter("options")
        .split(',')
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl VolumeProvisioner for NfsProvisioner {
    async fn provision(&self, request: ProvisionRequest) -> Result<VolumeRecord> {
        self.validate_access_modes(&request)?;
        debug!(name = %request.name, "new provision request received");

        let (path, uuid) = match self.create_volume(&request).await {
            Ok(created) => created,
            Err(err) => {
                warn!(name = %request.name, error = %err, "failed to create volume");
                return Err(err);
            }
        };
        debug!(name = %request.name, path = %path, "volume created");

        let mut annotations = BTreeMap::new();
        annotations.insert(ANNOTATION_UUID.to_string(), uuid);
        annotations.insert(
            ANNOTATION_HOSTS.to_string(),
            request.parameter("hosts").to_string(),
        );

        Ok(VolumeRecord {
            name: request.name.clone(),
            capacity_bytes: request.capacity_bytes,
            access_modes: request.access_modes.clone(),
            source: VolumeSource::Nfs(NfsVolumeSource {
                server: request.parameter("host").to_string(),
                path,
                readonly: request.parameter_bool("readonly"),
            }),
            annotations,
        })
    }

    async fn delete(&self, record: &VolumeRecord) -> Result<()> {
        let VolumeSource::Nfs(source) = &record.source else {
            return Err(Error::Configuration(
                "volume record has no nfs source".into(),
            ));
        };
        let uuid = record.annotation(ANNOTATION_UUID);
        debug!(name = %record.name, uuid, "volume deletion request");

        // An export that is already gone counts as removed; any other
        // failure aborts before the volume itself is touched.
        for host in record.annotation(ANNOTATION_HOSTS).split(',') {
            debug!(host, path = %source.path, "removing nfs export");
            if let Err(err) = self.export_destroy(host, &source.path).await {
                match err.remote_code() {
                    Some(code) if code == ErrorCode::NOT_FOUND_NFS_EXPORT => {
                        warn!(host, "nfs export was already removed");
                    }
                    Some(_) => {
                        warn!(host, error = %err, "failed to destroy nfs export");
                        return Err(err);
                    }
                    None => return Err(err),
                }
            }
            debug!(host, "nfs export removed");
        }

        debug!("removing filesystem volume");
        if let Err(err) = self.fs_destroy(uuid).await {
            // Volume destroy failures are logged, never surfaced.
            match err.remote_code() {
                Some(code) if code == ErrorCode::NOT_FOUND_VOLUME => {}
                _ => warn!(error = %err, "failed to destroy filesystem volume"),
            }
        }
        debug!("volume deletion request completed");
        Ok(())
    }

    fn access_modes(&self) -> &[AccessMode] {
        ACCESS_MODES
    }

    fn supports_block(&self) -> bool {
        false
    }
}
