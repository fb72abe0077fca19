//! kvgate - in-memory key-value registry service

use kvgate_service::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kvgate=info,kvgate_service=info,kvgate_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("Starting kvgate");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("UDP address: {}", config.udp_addr);
    tracing::info!("HTTP address: {}", config.http_addr);

    if let Err(e) = kvgate_service::run(config).await {
        tracing::error!("Service error: {}", e);
        std::process::exit(1);
    }
}
