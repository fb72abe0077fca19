//! UDP listener that applies `key:value` datagrams to the registry.
//!
//! `DatagramListener::bind` is the only way to obtain a listener, so a value of
//! this type is always bound and listening. `run` consumes it and drops the
//! socket on return; a closed listener cannot be restarted.

use kvgate::{DatagramUpdate, MAX_DATAGRAM_SIZE, ProtocolError};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::registry::Registry;

/// Pause after a packet that could not be handled
pub const DEFAULT_ERROR_PAUSE: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum DatagramError {
    #[error("Failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed datagram from {peer}: {source}")]
    Malformed {
        peer: SocketAddr,
        #[source]
        source: ProtocolError,
    },

    #[error("UDP receive failed: {0}")]
    Receive(#[source] std::io::Error),
}

pub struct DatagramListener {
    socket: UdpSocket,
    local_addr: SocketAddr,
    registry: Registry,
    error_pause: Duration,
}

impl DatagramListener {
    /// Bind with `SO_REUSEADDR` set. Must be called from within a Tokio runtime.
    pub async fn bind(addr: SocketAddr, registry: Registry) -> Result<Self, DatagramError> {
        let bind_err = |source| DatagramError::Bind { addr, source };

        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
            .map_err(bind_err)?;
        socket.set_reuse_address(true).map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;
        socket.bind(&addr.into()).map_err(bind_err)?;

        let socket = UdpSocket::from_std(socket.into()).map_err(bind_err)?;
        let local_addr = socket.local_addr().map_err(bind_err)?;

        info!("UDP listener bound on {}", local_addr);

        Ok(Self {
            socket,
            local_addr,
            registry,
            error_pause: DEFAULT_ERROR_PAUSE,
        })
    }

    pub fn with_error_pause(mut self, error_pause: Duration) -> Self {
        self.error_pause = error_pause;
        self
    }

    /// Actual bound address (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Receive and apply packets until `cancel` fires, then release the socket.
    ///
    /// Any failure handling a single packet is logged and followed by the error
    /// pause; it never ends the loop.
    pub async fn run(self, cancel: CancellationToken) {
        info!("UDP listener on {} accepting updates", self.local_addr);

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.receive(&mut buf) => result,
            };

            match result {
                Ok(update) => {
                    debug!("Datagram update for key '{}'", update.key);
                    self.registry.set(update.key, update.value);
                }
                Err(e) => {
                    match &e {
                        DatagramError::Malformed { .. } => warn!("{}", e),
                        _ => error!("{}", e),
                    }

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.error_pause) => {}
                    }
                }
            }
        }

        info!("UDP listener on {} closed", self.local_addr);
    }

    async fn receive(&self, buf: &mut [u8]) -> Result<DatagramUpdate, DatagramError> {
        let (len, peer) = self
            .socket
            .recv_from(buf)
            .await
            .map_err(DatagramError::Receive)?;

        DatagramUpdate::parse(&buf[..len])
            .map_err(|source| DatagramError::Malformed { peer, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        condition()
    }

    async fn start(
        registry: &Registry,
        error_pause: Duration,
    ) -> (
        SocketAddr,
        CancellationToken,
        tokio::task::JoinHandle<()>,
        std::net::UdpSocket,
    ) {
        let listener = DatagramListener::bind("127.0.0.1:0".parse().unwrap(), registry.clone())
            .await
            .unwrap()
            .with_error_pause(error_pause);
        let addr = listener.local_addr();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(listener.run(cancel.clone()));
        let sender = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        (addr, cancel, handle, sender)
    }

    #[tokio::test]
    async fn test_datagram_updates_registry() {
        let registry = Registry::new();
        let (addr, cancel, handle, sender) = start(&registry, DEFAULT_ERROR_PAUSE).await;

        sender.send_to(b"alpha:1,2,3", addr).unwrap();
        assert!(wait_until(|| registry.get("alpha").as_deref() == Some("1,2,3")).await);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_packets_do_not_stop_listener() {
        let registry = Registry::new();
        let (addr, cancel, handle, sender) = start(&registry, Duration::from_millis(10)).await;

        sender.send_to(b"nocolon", addr).unwrap();
        sender.send_to(&[0xff, 0xfe, b':', b'x'], addr).unwrap();
        sender.send_to(b"after:ok", addr).unwrap();

        assert!(wait_until(|| registry.get("after").as_deref() == Some("ok")).await);
        assert_eq!(registry.len(), 1);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_pause_follows_malformed_packet() {
        let registry = Registry::new();
        let (addr, cancel, handle, sender) = start(&registry, Duration::from_millis(800)).await;

        sender.send_to(b"garbage", addr).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        sender.send_to(b"k:v", addr).unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(registry.get("k").is_none());

        assert!(wait_until(|| registry.get("k").is_some()).await);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_valid_packets_are_applied_back_to_back() {
        let registry = Registry::new();
        let (addr, cancel, handle, sender) = start(&registry, Duration::from_secs(5)).await;

        let started = Instant::now();
        for i in 0..5 {
            sender.send_to(format!("k{}:{}", i, i).as_bytes(), addr).unwrap();
        }

        assert!(wait_until(|| registry.len() == 5).await);
        assert!(started.elapsed() < Duration::from_secs(2));
        for i in 0..5 {
            assert_eq!(registry.get(&format!("k{}", i)), Some(i.to_string()));
        }

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_during_pause() {
        let registry = Registry::new();
        let (addr, cancel, handle, sender) = start(&registry, Duration::from_secs(60)).await;

        sender.send_to(b"garbage", addr).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("listener did not observe cancellation during pause")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_releases_socket() {
        let registry = Registry::new();
        let (addr, cancel, handle, _sender) = start(&registry, DEFAULT_ERROR_PAUSE).await;

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();

        // A plain bind without SO_REUSEADDR only succeeds once the listener is gone
        let rebound = std::net::UdpSocket::bind(addr);
        assert!(rebound.is_ok());
    }

    #[tokio::test]
    async fn test_run_returns_immediately_when_already_cancelled() {
        let registry = Registry::new();
        let listener = DatagramListener::bind("127.0.0.1:0".parse().unwrap(), registry)
            .await
            .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), listener.run(cancel))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        // TEST-NET-3 is never assigned to a local interface
        let addr: SocketAddr = "203.0.113.7:0".parse().unwrap();
        let result = DatagramListener::bind(addr, Registry::new()).await;
        assert!(matches!(result, Err(DatagramError::Bind { .. })));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_oversized_payload_is_truncated_to_limit() {
        let registry = Registry::new();
        let (addr, cancel, handle, sender) = start(&registry, Duration::from_millis(10)).await;

        let mut payload = b"big:".to_vec();
        payload.extend(std::iter::repeat_n(b'x', 2000));
        sender.send_to(&payload, addr).unwrap();

        assert!(wait_until(|| registry.get("big").is_some()).await);
        assert_eq!(
            registry.get("big").unwrap().len(),
            MAX_DATAGRAM_SIZE - "big:".len()
        );

        cancel.cancel();
        handle.await.unwrap();
    }
}
