//! targetd JSON-RPC client
//!
//! One logical operation: `call(method, params)`. Every call builds its
//! own HTTP client against the fixed endpoint, so no connection state
//! outlives an invocation. Remote failures arrive as a structured
//! `{code, message}` payload in the JSON-RPC error member and are decoded
//! into [`Error::Remote`] here; the client never classifies them further.

use crate::error::{Error, Result};
use crate::targetd::ErrorInfo;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

// =============================================================================
// Configuration
// =============================================================================

/// Connection settings for the targetd endpoint
#[derive(Debug, Clone)]
pub struct TargetdConfig {
    /// URL scheme, `http` or `https`
    pub scheme: String,
    /// Username for the targetd connection
    pub username: String,
    /// Password for the targetd connection
    pub password: String,
    /// IP or DNS name of the targetd server
    pub address: String,
    /// Port targetd is listening on
    pub port: u16,
    /// Per-call request timeout
    pub timeout: Duration,
}

impl Default for TargetdConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            address: "localhost".to_string(),
            port: 18700,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TargetdConfig {
    /// The fixed RPC endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("{}://{}:{}/targetrpc", self.scheme, self.address, self.port)
    }
}

// =============================================================================
// Transport Port
// =============================================================================

/// Port for issuing one request/response call against targetd
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Issue a single synchronous remote call and return the decoded result.
    async fn call(&self, method: &str, params: Value) -> Result<Value>;
}

// =============================================================================
// Wire Envelope
// =============================================================================

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

fn decode_response(response: RpcResponse) -> Result<Value> {
    match (response.result, response.error) {
        (_, Some(error)) => match serde_json::from_value::<ErrorInfo>(error.clone()) {
            Ok(info) => Err(Error::Remote(info)),
            Err(_) => Err(Error::Protocol(format!(
                "unclassifiable error payload: {}",
                error
            ))),
        },
        (Some(result), None) => Ok(result),
        // Methods without a result value report result: null.
        (None, None) => Ok(Value::Null),
    }
}

// =============================================================================
// Client
// =============================================================================

/// Stateless targetd client: one connection per call
pub struct Client {
    config: TargetdConfig,
    next_id: AtomicU64,
}

impl Client {
    /// Create a new client for a fixed endpoint
    pub fn new(config: TargetdConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl RpcTransport for Client {
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let url = self.config.endpoint();
        debug!(%url, method, "opening connection to targetd");

        // Fresh client per call: the connection-per-call contract.
        let http = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .build()?;

        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let response = http
            .post(url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let response: RpcResponse = response.json().await?;
        debug!(method, "targetd call completed");
        decode_response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targetd::ErrorCode;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_default_endpoint() {
        let config = TargetdConfig::default();
        assert_eq!(config.endpoint(), "http://localhost:18700/targetrpc");
    }

    #[test]
    fn test_custom_endpoint() {
        let config = TargetdConfig {
            scheme: "https".into(),
            address: "targetd.storage.local".into(),
            port: 18701,
            ..Default::default()
        };
        assert_eq!(
            config.endpoint(),
            "https://targetd.storage.local:18701/targetrpc"
        );
    }

    #[test]
    fn test_request_envelope() {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method: "vol_create",
            params: json!({"pool": "vg-targetd", "name": "vol1", "size": 1024}),
            id: 7,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["method"], "vol_create");
        assert_eq!(value["params"]["pool"], "vg-targetd");
        assert_eq!(value["id"], 7);
    }

    #[test]
    fn test_decode_result() {
        let response: RpcResponse =
            serde_json::from_value(json!({"result": [{"lun": 0}], "id": 1})).unwrap();
        let result = decode_response(response).unwrap();
        assert_eq!(result[0]["lun"], 0);
    }

    #[test]
    fn test_decode_null_result() {
        let response: RpcResponse =
            serde_json::from_value(json!({"result": null, "id": 1})).unwrap();
        assert_eq!(decode_response(response).unwrap(), Value::Null);
    }

    #[test]
    fn test_decode_structured_error() {
        let response: RpcResponse = serde_json::from_value(
            json!({"error": {"code": -400, "message": "NFS export not found"}, "id": 1}),
        )
        .unwrap();
        let err = decode_response(response).unwrap_err();
        assert_eq!(err.remote_code(), Some(ErrorCode::NOT_FOUND_NFS_EXPORT));
    }

    #[test]
    fn test_decode_unclassifiable_error() {
        let response: RpcResponse =
            serde_json::from_value(json!({"error": "it broke", "id": 1})).unwrap();
        let err = decode_response(response).unwrap_err();
        assert_matches!(err, Error::Protocol(_));
        assert_eq!(err.remote_code(), None);
    }
}
