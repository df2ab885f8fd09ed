//! Domain layer - request/record types and the provisioner port
//!
//! Defines the core trait the backend adapters implement and the data
//! model exchanged with the external reconciliation loop.

pub mod ports;

pub use ports::*;
