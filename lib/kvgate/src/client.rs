//! kvgate clients for the HTTP API and the datagram listener

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::error::KvgateError;
use crate::protocol::DatagramUpdate;
use crate::types::{ErrorCode, ErrorResponse, KeyRequest, KeyValue, MessageResponse, Snapshot};

/// HTTP API client - upsert, snapshot and delete against a kvgate service
#[derive(Clone)]
pub struct KvgateClient {
    base_url: String,
    client: reqwest::Client,
}

impl KvgateClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        KvgateClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<String, KvgateError> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        if resp.status().is_success() {
            Ok("OK".to_string())
        } else {
            Err(KvgateError::ServerError(
                format!("Health check failed: {}", resp.status()),
                ErrorCode::InternalError,
            ))
        }
    }

    /// Insert or overwrite `key`. Returns the server's confirmation message.
    pub async fn upload(&self, key: &str, value: &str) -> Result<String, KvgateError> {
        let resp = self
            .client
            .post(format!("{}/upload", self.base_url))
            .json(&KeyValue::new(key, value))
            .send()
            .await?;

        if resp.status().is_success() {
            let body: MessageResponse = resp.json().await?;
            Ok(body.message)
        } else {
            Err(error_from_response(resp).await)
        }
    }

    pub async fn get_all(&self) -> Result<Snapshot, KvgateError> {
        let resp = self
            .client
            .get(format!("{}/get", self.base_url))
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            Err(error_from_response(resp).await)
        }
    }

    /// Delete `key`. A missing key is reported as [`KvgateError::KeyNotFound`].
    pub async fn delete(&self, key: &str) -> Result<String, KvgateError> {
        let resp = self
            .client
            .post(format!("{}/delete", self.base_url))
            .json(&KeyRequest {
                key: key.to_string(),
            })
            .send()
            .await?;

        if resp.status().is_success() {
            let body: MessageResponse = resp.json().await?;
            Ok(body.message)
        } else if resp.status() == reqwest::StatusCode::NOT_FOUND {
            Err(KvgateError::KeyNotFound(key.to_string()))
        } else {
            Err(error_from_response(resp).await)
        }
    }
}

async fn error_from_response(resp: reqwest::Response) -> KvgateError {
    let status = resp.status();
    let text = match resp.text().await {
        Ok(t) => t,
        Err(e) => return KvgateError::HttpError(e),
    };

    // Bodies from anything in front of the service may not be ErrorResponse
    match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(err) => KvgateError::ServerError(err.error, err.code),
        Err(_) => {
            let code = if status.is_client_error() {
                ErrorCode::BadRequest
            } else {
                ErrorCode::InternalError
            };
            KvgateError::ServerError(format!("{}: {}", status, text), code)
        }
    }
}

/// Fire-and-forget sender for the datagram listener
pub struct DatagramSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl DatagramSender {
    /// Bind an ephemeral local socket in the same address family as `target`.
    pub async fn new(target: SocketAddr) -> Result<Self, KvgateError> {
        let local: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local).await?;

        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub async fn send(&self, key: &str, value: &str) -> Result<usize, KvgateError> {
        self.send_update(&DatagramUpdate::new(key, value)).await
    }

    pub async fn send_update(&self, update: &DatagramUpdate) -> Result<usize, KvgateError> {
        let payload = update.encode()?;
        self.send_raw(&payload).await
    }

    /// Send bytes as-is, without protocol validation.
    pub async fn send_raw(&self, payload: &[u8]) -> Result<usize, KvgateError> {
        let sent = self.socket.send_to(payload, self.target).await?;
        tracing::debug!("Sent {} byte datagram to {}", sent, self.target);
        Ok(sent)
    }
}
