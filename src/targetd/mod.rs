//! targetd wire layer
//!
//! The JSON-RPC client for the targetd storage daemon and the remote
//! error-code space its failures are classified against. Backend
//! provisioners depend on the [`RpcTransport`] port, never on the
//! concrete HTTP client.

pub mod client;
pub mod error;

#[cfg(test)]
pub mod testing;

pub use client::{Client, RpcTransport, TargetdConfig};
pub use error::{ErrorCode, ErrorInfo};
