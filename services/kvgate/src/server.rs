//! kvgate HTTP Server and lifecycle
//!
//! The UDP listener runs as a background task for exactly as long as the HTTP
//! server. Whichever way the server stops, the listener is cancelled and its
//! socket closed before `serve` returns.

use axum::{
    Router,
    routing::{get, post},
};
use std::future::Future;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::ServiceError;
use crate::config::Config;
use crate::datagram::DatagramListener;
use crate::handlers;
use crate::registry::Registry;

pub fn create_router(registry: Registry) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/upload", post(handlers::upload))
        .route("/get", get(handlers::get_all))
        .route("/delete", post(handlers::delete))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

/// Bind both ingress paths and run until SIGINT or SIGTERM.
pub async fn run(config: Config) -> Result<(), ServiceError> {
    let registry = Registry::new();

    let datagram = DatagramListener::bind(config.udp_addr, registry.clone())
        .await?
        .with_error_pause(config.datagram_error_pause);

    let listener = TcpListener::bind(config.http_addr).await?;

    serve(listener, datagram, registry, shutdown_signal()).await
}

/// Serve HTTP on `listener` and datagrams on `datagram` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    datagram: DatagramListener,
    registry: Registry,
    shutdown: F,
) -> Result<(), ServiceError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let cancel = CancellationToken::new();
    // Cancels the listener even if this future is dropped mid-serve
    let _cancel_on_drop = cancel.clone().drop_guard();

    let datagram_handle = tokio::spawn(datagram.run(cancel.clone()));

    match listener.local_addr() {
        Ok(addr) => info!("HTTP API listening on {}", addr),
        Err(e) => error!("HTTP API listening on unknown address: {}", e),
    }

    let app = create_router(registry);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    if let Err(e) = &served {
        error!("HTTP server error: {}", e);
    }

    info!("Stopping UDP listener");
    cancel.cancel();
    let joined = datagram_handle.await;

    served?;
    joined?;

    info!("Shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT signal
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C signal"),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Starting graceful shutdown...");
}
