//! Domain Ports - Core trait definitions for the provisioning bridge
//!
//! These types define the boundary between the external reconciliation
//! loop and the backend provisioners. The reconciliation loop hands a
//! [`ProvisionRequest`] to a [`VolumeProvisioner`] and stores the
//! returned [`VolumeRecord`]; the record is later passed back unchanged
//! to `delete`, which must reverse the create using nothing but the
//! record itself.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// Access Modes
// =============================================================================

/// Access modes a volume can be requested with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessMode {
    /// Mounted read-write by a single consumer
    ReadWriteOnce,
    /// Mounted read-only by many consumers
    ReadOnlyMany,
    /// Mounted read-write by many consumers
    ReadWriteMany,
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::ReadWriteOnce => write!(f, "ReadWriteOnce"),
            AccessMode::ReadOnlyMany => write!(f, "ReadOnlyMany"),
            AccessMode::ReadWriteMany => write!(f, "ReadWriteMany"),
        }
    }
}

/// Check that every requested access mode is contained in the supported set.
pub fn contains_all(supported: &[AccessMode], requested: &[AccessMode]) -> bool {
    requested.iter().all(|mode| supported.contains(mode))
}

// =============================================================================
// Provisioning Request
// =============================================================================

/// Request to provision a volume
///
/// Immutable for the duration of one provision call. `parameters` carries
/// the caller-supplied backend-specific settings (pool name, initiator or
/// host lists, export options, CHAP flags, filesystem type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionRequest {
    /// Caller-assigned, globally unique volume name
    pub name: String,
    /// Requested capacity in bytes
    pub capacity_bytes: u64,
    /// Requested access modes
    pub access_modes: Vec<AccessMode>,
    /// Backend-specific parameters
    pub parameters: BTreeMap<String, String>,
}

impl ProvisionRequest {
    /// A string parameter, empty when absent.
    pub fn parameter(&self, key: &str) -> &str {
        self.parameters.get(key).map(String::as_str).unwrap_or("")
    }

    /// A boolean parameter, `false` when absent or unparseable.
    pub fn parameter_bool(&self, key: &str) -> bool {
        self.parameter(key).parse().unwrap_or(false)
    }
}

// =============================================================================
// Volume Record
// =============================================================================

/// Backend-specific location descriptor for a provisioned volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeSource {
    Iscsi(IscsiVolumeSource),
    Nfs(NfsVolumeSource),
}

/// Location of a block volume: target portal + IQN + LUN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IscsiVolumeSource {
    pub target_portal: String,
    pub portals: Vec<String>,
    pub iqn: String,
    pub iscsi_interface: String,
    pub lun: u32,
    pub readonly: bool,
    pub fs_type: String,
    pub discovery_chap_auth: bool,
    pub session_chap_auth: bool,
    /// Name of the CHAP credential secret, set when either CHAP flag is on
    pub chap_secret: Option<String>,
}

/// Location of a file volume: server host + export path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NfsVolumeSource {
    pub server: String,
    pub path: String,
    pub readonly: bool,
}

/// The artifact returned by `provision` and later passed back to `delete`
///
/// The annotation set is the only state persisted between create and
/// delete: it must carry everything delete needs to reverse the create
/// (pool name, initiator or host list, and for NFS the remote volume's
/// unique id). Delete never queries the remote side to recover this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeRecord {
    /// Logical volume name
    pub name: String,
    /// Provisioned capacity in bytes
    pub capacity_bytes: u64,
    /// Access modes the volume was provisioned with
    pub access_modes: Vec<AccessMode>,
    /// Backend-specific location descriptor
    pub source: VolumeSource,
    /// Fixed-key annotations consumed by `delete`
    pub annotations: BTreeMap<String, String>,
}

impl VolumeRecord {
    /// An annotation value, empty when absent.
    pub fn annotation(&self, key: &str) -> &str {
        self.annotations.get(key).map(String::as_str).unwrap_or("")
    }
}

// =============================================================================
// Volume Provisioner Port
// =============================================================================

/// Port for backend volume provisioning
///
/// One concrete type per backend (block/iSCSI, file/NFS), selected at
/// construction. Implementations hold no mutable state between
/// invocations, so concurrent calls for distinct volumes are independent.
#[async_trait]
pub trait VolumeProvisioner: Send + Sync {
    /// Create a backing volume and its network export(s)
    async fn provision(&self, request: ProvisionRequest) -> Result<VolumeRecord>;

    /// Destroy the remote resources recorded in the volume record
    async fn delete(&self, record: &VolumeRecord) -> Result<()>;

    /// Access modes this backend supports
    fn access_modes(&self) -> &[AccessMode];

    /// Whether this backend provisions block volumes
    fn supports_block(&self) -> bool;

    /// Validate requested access modes against the supported set
    fn validate_access_modes(&self, request: &ProvisionRequest) -> Result<()> {
        if !contains_all(self.access_modes(), &request.access_modes) {
            return Err(Error::UnsupportedAccessModes {
                requested: request.access_modes.clone(),
                supported: self.access_modes().to_vec(),
            });
        }
        Ok(())
    }
}

pub type VolumeProvisionerRef = Arc<dyn VolumeProvisioner>;
