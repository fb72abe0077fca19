//! Datagram protocol for kvgate.
//!
//! One update per packet, UTF-8 text of the form `{key}:{value}`. The packet is
//! split on the first colon only, so values may contain colons and keys may not.
//! Senders never receive a reply.

use thiserror::Error;

/// Largest payload the listener reads from a single packet
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Default port for both the UDP listener and the HTTP API
pub const DEFAULT_PORT: u16 = 5000;

const SEPARATOR: char = ':';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Payload has no ':' separator")]
    MissingSeparator,

    #[error("Key contains ':' separator: {0}")]
    SeparatorInKey(String),

    #[error("Payload is {0} bytes, limit is 1024")]
    PayloadTooLarge(usize),
}

/// A single `key:value` update carried by one datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatagramUpdate {
    pub key: String,
    pub value: String,
}

impl DatagramUpdate {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parse a received payload. A single trailing `\n` or `\r\n` is dropped.
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(payload)?;
        let text = strip_line_terminator(text);
        let (key, value) = text
            .split_once(SEPARATOR)
            .ok_or(ProtocolError::MissingSeparator)?;

        Ok(Self::new(key, value))
    }

    /// Encode for sending. Fails if the key would not survive a round trip or the
    /// payload would be truncated by the listener.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        if self.key.contains(SEPARATOR) {
            return Err(ProtocolError::SeparatorInKey(self.key.clone()));
        }

        let payload = format!("{}{}{}", self.key, SEPARATOR, self.value).into_bytes();
        if payload.len() > MAX_DATAGRAM_SIZE {
            return Err(ProtocolError::PayloadTooLarge(payload.len()));
        }

        Ok(payload)
    }
}

fn strip_line_terminator(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}
