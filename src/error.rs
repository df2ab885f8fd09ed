//! Error types for the targetd operator
//!
//! One unified error type covers configuration, request validation, the
//! targetd wire protocol, and local IO. Remote failures that targetd
//! reports as a structured `{code, message}` payload are carried as
//! [`Error::Remote`] so callers can classify them without re-parsing
//! error text.

use thiserror::Error;

use crate::domain::ports::AccessMode;
use crate::targetd::{ErrorCode, ErrorInfo};

/// Unified error type for the operator
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration / Validation Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("invalid access modes {requested:?}: only access modes {supported:?} are supported")]
    UnsupportedAccessModes {
        requested: Vec<AccessMode>,
        supported: Vec<AccessMode>,
    },

    // =========================================================================
    // targetd Remote Errors
    // =========================================================================
    #[error("targetd error: {0}")]
    Remote(#[from] ErrorInfo),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    #[error("targetd transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid targetd response: {0}")]
    Protocol(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    // =========================================================================
    // Provisioning Errors
    // =========================================================================
    #[error("255 luns allocated, no more luns available")]
    NoFreeLun,

    #[error("failed to find the created volume")]
    CreatedVolumeNotFound,

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The remote error code, when targetd reported a structured failure.
    ///
    /// Returns `None` for every other variant: those are opaque or
    /// transport-level failures and must never be treated as a known
    /// remote condition.
    pub fn remote_code(&self) -> Option<ErrorCode> {
        match self {
            Error::Remote(info) => Some(info.code),
            _ => None,
        }
    }
}

/// Result type alias for the operator
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_code_classification() {
        let err = Error::Remote(ErrorInfo {
            code: ErrorCode::NOT_FOUND_NFS_EXPORT,
            message: "export not found".into(),
        });
        assert_eq!(err.remote_code(), Some(ErrorCode::NOT_FOUND_NFS_EXPORT));

        let err = Error::Protocol("truncated response".into());
        assert_eq!(err.remote_code(), None);

        let err = Error::Configuration("bad endpoint".into());
        assert_eq!(err.remote_code(), None);
    }

    #[test]
    fn test_remote_error_display() {
        let err = Error::Remote(ErrorInfo {
            code: ErrorCode::NAME_CONFLICT,
            message: "volume exists".into(),
        });
        assert_eq!(err.to_string(), "targetd error: volume exists (code -50)");
    }

    #[test]
    fn test_unsupported_access_modes_display() {
        let err = Error::UnsupportedAccessModes {
            requested: vec![AccessMode::ReadWriteMany],
            supported: vec![AccessMode::ReadWriteOnce, AccessMode::ReadOnlyMany],
        };
        let text = err.to_string();
        assert!(text.contains("ReadWriteMany"));
        assert!(text.contains("only access modes"));
    }
}
