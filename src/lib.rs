//! targetd Operator - Volume Provisioning Bridge
//!
//! Bridges cluster volume-provisioning requests to the targetd storage
//! daemon, which exposes block (iSCSI) and file (NFS) volume primitives
//! over a JSON-RPC endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 External Reconciliation Loop                 │
//! │          (provision / delete, retry, leader election)        │
//! └───────────────┬─────────────────────────────┬───────────────┘
//!                 │                             │
//!       ┌─────────┴─────────┐         ┌─────────┴─────────┐
//!       │  Block Backend    │         │   File Backend    │
//!       │  (iSCSI + LUN     │         │   (NFS exports,   │
//!       │   allocation,     │         │    idempotent     │
//!       │   session CHAP)   │         │    delete)        │
//!       └─────────┬─────────┘         └─────────┬─────────┘
//!                 │                             │
//!                 └──────────────┬──────────────┘
//!                                │
//!                   ┌────────────┴────────────┐
//!                   │    targetd RPC Client   │
//!                   │  (one connection/call)  │
//!                   └────────────┬────────────┘
//!                                │
//!                   ┌────────────┴────────────┐
//!                   │     targetd daemon      │
//!                   └─────────────────────────┘
//! ```
//!
//! Every provision returns a [`VolumeRecord`] whose annotation set
//! carries all the state a later [`VolumeProvisioner::delete`] needs to
//! reverse the create; nothing is persisted locally.
//!
//! # Modules
//!
//! - [`backends`]: block and file provisioners, LUN allocation, CHAP credentials
//! - [`domain`]: request/record types and the provisioner trait
//! - [`error`]: error types and handling
//! - [`targetd`]: JSON-RPC client and remote error codes

pub mod backends;
pub mod domain;
pub mod error;
pub mod targetd;

// Re-export commonly used types
pub use backends::{
    BackendConfig, BackendFactory, ChapSessionCredentials, FsVolume, IscsiConfig, IscsiExport,
    IscsiProvisioner, NfsProvisioner, DEFAULT_VOLUME_GROUP,
    first_available_lun,
};

pub use domain::ports::{
    AccessMode, IscsiVolumeSource, NfsVolumeSource, ProvisionRequest, VolumeProvisioner,
    VolumeProvisionerRef, VolumeRecord, VolumeSource,
};

pub use error::{Error, Result};

pub use targetd::{Client, ErrorCode, ErrorInfo, RpcTransport, TargetdConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
