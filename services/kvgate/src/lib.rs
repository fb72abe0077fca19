//! kvgate - in-memory key-value registry service
//!
//! One registry, two ways in:
//! - **UDP**: fire-and-forget `key:value` datagrams, never acknowledged
//! - **HTTP**: `POST /upload`, `GET /get`, `POST /delete` with JSON bodies
//!
//! Both paths share a single [`Registry`] handle. Every registry operation is
//! atomic on its own, so the two paths may interleave freely without torn
//! reads or partially applied writes.

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

pub mod config;
pub mod datagram;
pub mod handlers;
pub mod registry;
pub mod server;

use thiserror::Error;

pub use config::Config;
pub use datagram::{DatagramError, DatagramListener};
pub use registry::{Registry, RegistryError};
pub use server::{create_router, run, serve};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Datagram listener error: {0}")]
    Datagram(#[from] DatagramError),
    #[error("HTTP server error: {0}")]
    Http(#[from] std::io::Error),
    #[error("Datagram listener task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
