//! kvgate Error Types

use thiserror::Error;

use crate::protocol::ProtocolError;
use crate::types::ErrorCode;

#[derive(Error, Debug)]
pub enum KvgateError {
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Server error ({1:?}): {0}")]
    ServerError(String, ErrorCode),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
