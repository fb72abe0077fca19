//! kvgate client library
//!
//! Shared wire types, the `key:value` datagram protocol, and clients for both
//! ingress paths of a kvgate registry (HTTP and UDP).

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

pub mod client;
pub mod error;
pub mod protocol;
pub mod types;

pub use client::{DatagramSender, KvgateClient};
pub use error::KvgateError;
pub use protocol::{DEFAULT_PORT, DatagramUpdate, MAX_DATAGRAM_SIZE, ProtocolError};
pub use types::{ErrorCode, ErrorResponse, KeyRequest, KeyValue, MessageResponse, Snapshot};
