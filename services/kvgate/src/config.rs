//! Service configuration

use kvgate::DEFAULT_PORT;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::ServiceError;
use crate::datagram::DEFAULT_ERROR_PAUSE;

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// UDP listener address (`UDP_HOST`, `UDP_PORT`)
    pub udp_addr: SocketAddr,
    /// HTTP API address (`HTTP_HOST`, `PORT`)
    pub http_addr: SocketAddr,
    /// Pause after a datagram that could not be handled (`DATAGRAM_ERROR_PAUSE_MS`)
    pub datagram_error_pause: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let all_interfaces = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        Self {
            udp_addr: SocketAddr::new(all_interfaces, DEFAULT_PORT),
            http_addr: SocketAddr::new(all_interfaces, DEFAULT_PORT),
            datagram_error_pause: DEFAULT_ERROR_PAUSE,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServiceError> {
        let defaults = Self::default();

        let udp_host = parse_or(&lookup, "UDP_HOST", defaults.udp_addr.ip())?;
        let udp_port = parse_or(&lookup, "UDP_PORT", defaults.udp_addr.port())?;
        let http_host = parse_or(&lookup, "HTTP_HOST", defaults.http_addr.ip())?;
        let http_port = parse_or(&lookup, "PORT", defaults.http_addr.port())?;
        let pause_ms = parse_or(
            &lookup,
            "DATAGRAM_ERROR_PAUSE_MS",
            defaults.datagram_error_pause.as_millis() as u64,
        )?;

        Ok(Self {
            udp_addr: SocketAddr::new(udp_host, udp_port),
            http_addr: SocketAddr::new(http_host, http_port),
            datagram_error_pause: Duration::from_millis(pause_ms),
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ServiceError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ServiceError::Config(format!("{} must be valid: {}", name, e))),
        None => Ok(default),
    }
}
