//! Storage Backend Provisioners
//!
//! Provides the two targetd-backed provisioners:
//! - Block: iSCSI exports of targetd logical volumes
//! - File: NFS exports of targetd filesystem volumes

pub mod block;
pub mod chap;
pub mod file;
pub mod lun;

pub use block::{IscsiConfig, IscsiExport, IscsiProvisioner};
pub use chap::ChapSessionCredentials;
pub use file::{FsVolume, NfsProvisioner};
pub use lun::first_available_lun;

use crate::domain::ports::{ProvisionRequest, VolumeProvisionerRef};
use crate::error::{Error, Result};
use crate::targetd::RpcTransport;
use std::sync::Arc;

/// Pool used when the caller does not name one
pub const DEFAULT_VOLUME_GROUP: &str = "vg-targetd";

pub(crate) fn volume_group(request: &ProvisionRequest) -> String {
    match request.parameter("volumeGroup") {
        "" => DEFAULT_VOLUME_GROUP.to_string(),
        pool => pool.to_string(),
    }
}

/// Factory for creating backend provisioners
pub struct BackendFactory;

impl BackendFactory {
    /// Create a provisioner by backend name
    pub fn create(
        name: &str,
        rpc: Arc<dyn RpcTransport>,
        config: BackendConfig,
    ) -> Result<VolumeProvisionerRef> {
        match name.to_lowercase().as_str() {
            "iscsi" | "block" => Ok(Arc::new(IscsiProvisioner::new(rpc, config.iscsi))),
            "nfs" | "file" => Ok(Arc::new(NfsProvisioner::new(rpc))),
            _ => Err(Error::Configuration(format!("unknown backend: {}", name))),
        }
    }
}

/// Combined backend configuration
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    pub iscsi: IscsiConfig,
}
