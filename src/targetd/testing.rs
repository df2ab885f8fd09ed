//! Scripted transport for provisioner tests
//!
//! Records every remote call in order and replays per-method scripted
//! responses, so tests can assert the exact call sequence and the abort
//! point of a failing multi-step operation.

use crate::error::{Error, Result};
use crate::targetd::{ErrorInfo, RpcTransport};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// One recorded remote call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub params: Value,
}

/// Scripted response for a method
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Succeed with this result value
    Result(Value),
    /// Fail with a structured remote error
    RemoteError(ErrorInfo),
    /// Fail with an opaque transport-level error
    OpaqueError(String),
}

/// In-memory [`RpcTransport`] with per-method response queues
///
/// Unscripted calls succeed with a null result, matching the daemon's
/// response for methods that return nothing.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, VecDeque<MockResponse>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the next response for `method`.
    pub fn respond(&self, method: &str, response: MockResponse) {
        self.responses
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    /// All calls issued so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Method names of all calls issued so far, in order.
    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.method).collect()
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            params,
        });

        let next = self
            .responses
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(VecDeque::pop_front);

        match next {
            None => Ok(Value::Null),
            Some(MockResponse::Result(value)) => Ok(value),
            Some(MockResponse::RemoteError(info)) => Err(Error::Remote(info)),
            Some(MockResponse::OpaqueError(message)) => Err(Error::Protocol(message)),
        }
    }
}
