//! targetd remote error codes
//!
//! targetd reports failures as a structured `{code, message}` payload in
//! the JSON-RPC error member. The code space is a fixed set of integers
//! shared by both backends, with backend-specific members. Two constants
//! share -303 on the wire, so the space is modeled as an integer newtype
//! with associated constants rather than a closed enum.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Codes
// =============================================================================

/// A targetd error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    // Common
    pub const INVALID: ErrorCode = ErrorCode(-1);
    pub const NAME_CONFLICT: ErrorCode = ErrorCode(-50);
    pub const NO_SUPPORT: ErrorCode = ErrorCode(-153);
    pub const UNEXPECTED_EXIT_CODE: ErrorCode = ErrorCode(-303);
    pub const INVALID_ARGUMENT: ErrorCode = ErrorCode(-32602);

    // Specific to block
    pub const EXISTS_INITIATOR: ErrorCode = ErrorCode(-52);
    pub const NOT_FOUND_VOLUME: ErrorCode = ErrorCode(-103);
    pub const NOT_FOUND_VOLUME_GROUP: ErrorCode = ErrorCode(-152);
    pub const NOT_FOUND_ACCESS_GROUP: ErrorCode = ErrorCode(-200);
    pub const VOLUME_MASKED: ErrorCode = ErrorCode(-303);
    pub const NO_FREE_HOST_LUN_ID: ErrorCode = ErrorCode(-1000);

    // Specific to FS/NFS
    pub const EXISTS_CLONE_NAME: ErrorCode = ErrorCode(-51);
    pub const EXISTS_FS_NAME: ErrorCode = ErrorCode(-53);
    pub const NOT_FOUND_FS: ErrorCode = ErrorCode(-104);
    pub const INVALID_POOL: ErrorCode = ErrorCode(-110);
    pub const NOT_FOUND_SNAPSHOT: ErrorCode = ErrorCode(-112);
    pub const NOT_FOUND_VOLUME_EXPORT: ErrorCode = ErrorCode(-151);
    pub const NOT_FOUND_NFS_EXPORT: ErrorCode = ErrorCode(-400);
    pub const NFS_NO_SUPPORT: ErrorCode = ErrorCode(-401);
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Error Info
// =============================================================================

/// Structured remote failure decoded from the JSON-RPC error member
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} (code {code})")]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_decode() {
        let info: ErrorInfo =
            serde_json::from_str(r#"{"code":-400,"message":"NFS export not found"}"#).unwrap();
        assert_eq!(info.code, ErrorCode::NOT_FOUND_NFS_EXPORT);
        assert_eq!(info.message, "NFS export not found");
    }

    #[test]
    fn test_error_info_roundtrip() {
        let info = ErrorInfo {
            code: ErrorCode::NO_FREE_HOST_LUN_ID,
            message: "no free host LUN id".into(),
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("-1000"));
        let back: ErrorInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn test_display() {
        let info = ErrorInfo {
            code: ErrorCode::NOT_FOUND_FS,
            message: "filesystem not found".into(),
        };
        assert_eq!(info.to_string(), "filesystem not found (code -104)");
    }

    #[test]
    fn test_unknown_code_still_decodes() {
        let info: ErrorInfo =
            serde_json::from_str(r#"{"code":-9999,"message":"boom"}"#).unwrap();
        assert_eq!(info.code, ErrorCode(-9999));
    }
}
