//! Block (iSCSI) volume provisioner
//!
//! Provisions a targetd logical volume and one iSCSI export per
//! initiator, at a single LUN allocated from the daemon's shared LUN
//! namespace. Steps are strictly sequential and a failing step aborts
//! the whole operation without rollback: volumes or exports created
//! before the failure remain on the remote side and are left for the
//! caller's retry of the full operation.

use crate::backends::chap::ChapSessionCredentials;
use crate::backends::lun::first_available_lun;
use crate::backends::volume_group;
use crate::domain::ports::{
    AccessMode, IscsiVolumeSource, ProvisionRequest, VolumeProvisioner, VolumeRecord, VolumeSource,
};
use crate::error::Result;
use crate::targetd::RpcTransport;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

// Annotation keys consumed by delete; written in full at create time so
// delete never queries the remote side to recover state.
pub const ANNOTATION_VOLUME_NAME: &str = "volume_name";
pub const ANNOTATION_POOL: &str = "pool";
pub const ANNOTATION_INITIATORS: &str = "initiators";

const ACCESS_MODES: &[AccessMode] = &[AccessMode::ReadWriteOnce, AccessMode::ReadOnlyMany];

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the iSCSI provisioner
#[derive(Debug, Clone)]
pub struct IscsiConfig {
    /// Filesystem to use when the caller does not specify one
    pub default_fs: String,
    /// Path of the session CHAP credential file
    pub chap_credential_path: PathBuf,
    /// Provisioner name, used to derive the CHAP secret name
    pub provisioner_name: String,
}

impl Default for IscsiConfig {
    fn default() -> Self {
        Self {
            default_fs: "xfs".to_string(),
            chap_credential_path: PathBuf::from(
                "/var/run/secrets/iscsi-provisioner/session-chap-credential.properties",
            ),
            provisioner_name: "iscsi-targetd".to_string(),
        }
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct VolCreateArgs<'a> {
    pool: &'a str,
    name: &'a str,
    size: u64,
}

#[derive(Debug, Serialize)]
struct VolDestroyArgs<'a> {
    pool: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct ExportCreateArgs<'a> {
    pool: &'a str,
    vol: &'a str,
    initiator_wwn: &'a str,
    lun: u32,
}

#[derive(Debug, Serialize)]
struct ExportDestroyArgs<'a> {
    pool: &'a str,
    vol: &'a str,
    initiator_wwn: &'a str,
}

#[derive(Debug, Serialize)]
struct InitiatorSetAuthArgs<'a> {
    initiator_wwn: &'a str,
    in_user: &'a str,
    in_pass: &'a str,
    out_user: &'a str,
    out_pass: &'a str,
}

/// One row of the daemon's export table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IscsiExport {
    pub initiator_wwn: String,
    pub lun: u32,
    pub vol_name: String,
    pub vol_size: u64,
    pub vol_uuid: String,
    pub pool: String,
}

// =============================================================================
// iSCSI Provisioner
// =============================================================================

/// Provisioner for block volumes exported over iSCSI
pub struct IscsiProvisioner {
    config: IscsiConfig,
    rpc: Arc<dyn RpcTransport>,
}

impl IscsiProvisioner {
    /// Create a new iSCSI provisioner
    pub fn new(rpc: Arc<dyn RpcTransport>, config: IscsiConfig) -> Self {
        Self { config, rpc }
    }

    /// Run the create sequence: allocate a LUN from a fresh export-table
    /// snapshot, create the volume, then export it to each initiator in
    /// list order. Returns (volume name, lun, pool).
    async fn create_volume(&self, request: &ProvisionRequest) -> Result<(String, u32, String)> {
        let vol = request.name.clone();
        let size = request.capacity_bytes;
        let pool = volume_group(request);
        let initiators = initiators(request);
        let session_chap = request.parameter_bool("chapAuthSession");

        // Credentials are read fresh for every provision that asks for
        // session CHAP; a load failure aborts before any remote call.
        let chap = if session_chap {
            match ChapSessionCredentials::load(&self.config.chap_credential_path).await {
                Ok(credentials) => Some(credentials),
                Err(err) => {
                    warn!(error = %err, "failed to load chap credentials");
                    return Err(err);
                }
            }
        } else {
            None
        };

        debug!("calling export_list");
        let exports = self.export_list().await?;
        let lun = first_available_lun(&exports)?;

        debug!(vol = %vol, size, pool = %pool, "creating volume");
        self.vol_create(&vol, size, &pool).await?;

        for initiator in &initiators {
            debug!(initiator = %initiator, lun, "exporting volume");
            self.export_create(&vol, lun, &pool, initiator).await?;
            if let Some(chap) = &chap {
                debug!(
                    initiator = %initiator,
                    in_user = %chap.in_user,
                    out_user = %chap.out_user,
                    "setting up chap session auth"
                );
                self.set_initiator_auth(initiator, chap).await?;
            }
        }

        Ok((vol, lun, pool))
    }

    async fn export_list(&self) -> Result<Vec<IscsiExport>> {
        let result = self.rpc.call("export_list", Value::Null).await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(result)?)
    }

    async fn vol_create(&self, name: &str, size: u64, pool: &str) -> Result<()> {
        let args = VolCreateArgs { pool, name, size };
        self.rpc
            .call("vol_create", serde_json::to_value(&args)?)
            .await?;
        Ok(())
    }

    async fn vol_destroy(&self, name: &str, pool: &str) -> Result<()> {
        let args = VolDestroyArgs { pool, name };
        self.rpc
            .call("vol_destroy", serde_json::to_value(&args)?)
            .await?;
        Ok(())
    }

    async fn export_create(&self, vol: &str, lun: u32, pool: &str, initiator: &str) -> Result<()> {
        let args = ExportCreateArgs {
            pool,
            vol,
            initiator_wwn: initiator,
            lun,
        };
        self.rpc
            .call("export_create", serde_json::to_value(&args)?)
            .await?;
        Ok(())
    }

    async fn export_destroy(&self, vol: &str, pool: &str, initiator: &str) -> Result<()> {
        let args = ExportDestroyArgs {
            pool,
            vol,
            initiator_wwn: initiator,
        };
        self.rpc
            .call("export_destroy", serde_json::to_value(&args)?)
            .await?;
        Ok(())
    }

    async fn set_initiator_auth(
        &self,
        initiator: &str,
        credentials: &ChapSessionCredentials,
    ) -> Result<()> {
        let args = InitiatorSetAuthArgs {
            initiator_wwn: initiator,
            in_user: &credentials.in_user,
            in_pass: &credentials.in_password,
            out_user: &credentials.out_user,
            out_pass: &credentials.out_password,
        };
        self.rpc
            .call("initiator_set_auth", serde_json::to_value(&args)?)
            .await?;
        Ok(())
    }
}

fn initiators(request: &ProvisionRequest) -> Vec<String> {
    request
        .parameter("initiators")
        .split(',')
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl VolumeProvisioner for IscsiProvisioner {
    async fn provision(&self, request: ProvisionRequest) -> Result<VolumeRecord> {
        self.validate_access_modes(&request)?;
        debug!(name = %request.name, "new provision request received");

        let (vol, lun, pool) = match self.create_volume(&request).await {
            Ok(created) => created,
            Err(err) => {
                warn!(name = %request.name, error = %err, "failed to create volume");
                return Err(err);
            }
        };
        debug!(vol = %vol, lun, "volume created");

        let mut annotations = BTreeMap::new();
        annotations.insert(ANNOTATION_VOLUME_NAME.to_string(), vol);
        annotations.insert(ANNOTATION_POOL.to_string(), pool);
        annotations.insert(
            ANNOTATION_INITIATORS.to_string(),
            request.parameter("initiators").to_string(),
        );

        let portals = match request.parameter("portals") {
            "" => Vec::new(),
            portals => portals.split(',').map(str::to_string).collect(),
        };
        let fs_type = match request.parameter("fsType") {
            "" => self.config.default_fs.clone(),
            fs_type => fs_type.to_string(),
        };
        let discovery_chap = request.parameter_bool("chapAuthDiscovery");
        let session_chap = request.parameter_bool("chapAuthSession");

        Ok(VolumeRecord {
            name: request.name.clone(),
            capacity_bytes: request.capacity_bytes,
            access_modes: request.access_modes.clone(),
            source: VolumeSource::Iscsi(IscsiVolumeSource {
                target_portal: request.parameter("targetPortal").to_string(),
                portals,
                iqn: request.parameter("iqn").to_string(),
                iscsi_interface: request.parameter("iscsiInterface").to_string(),
                lun,
                readonly: request.parameter_bool("readonly"),
                fs_type,
                discovery_chap_auth: discovery_chap,
                session_chap_auth: session_chap,
                chap_secret: (discovery_chap || session_chap)
                    .then(|| format!("{}-chap-secret", self.config.provisioner_name)),
            }),
            annotations,
        })
    }

    async fn delete(&self, record: &VolumeRecord) -> Result<()> {
        let vol = record.annotation(ANNOTATION_VOLUME_NAME);
        let pool = record.annotation(ANNOTATION_POOL);
        debug!(name = %record.name, vol, pool, "volume deletion request received");

        // Exports go first, in the order they were created; the first
        // failure aborts and vol_destroy is never reached.
        for initiator in record.annotation(ANNOTATION_INITIATORS).split(',') {
            debug!(initiator, "removing iscsi export");
            if let Err(err) = self.export_destroy(vol, pool, initiator).await {
                warn!(initiator, error = %err, "failed to destroy iscsi export");
                return Err(err);
            }
            debug!(initiator, "iscsi export removed");
        }

        debug!("removing logical volume");
        if let Err(err) = self.vol_destroy(vol, pool).await {
            warn!(error = %err, "failed to remove logical volume");
            return Err(err);
        }
        debug!("volume deletion request completed");
        Ok(())
    }

    fn access_modes(&self) -> &[AccessMode] {
        ACCESS_MODES
    }

    fn supports_block(&self) -> bool {
        true
    }
}
