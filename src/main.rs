use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use steam_dashboard::{DashboardConfig, DashboardEngine, GrpcServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "steam_dashboard=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Steam Dashboard Service v{}", env!("CARGO_PKG_VERSION"));

    let config = DashboardConfig::from_env()?;

    info!("Configuration loaded:");
    info!("  gRPC Port: {}", config.grpc_port);
    info!("  Data location: {}", config.data_location);
    info!("  Data format: {}", config.data_format);

    let engine = Arc::new(DashboardEngine::new(&config));
    engine.warm_up().await?;
    info!("Dashboard engine initialized successfully");

    let grpc_server = GrpcServer::new(engine.clone());
    let grpc_addr: SocketAddr = ([0, 0, 0, 0], config.grpc_port).into();
    let grpc_handle = tokio::spawn(async move {
        if let Err(e) = grpc_server.start(grpc_addr).await {
            error!("gRPC server error: {}", e);
        }
    });

    info!("gRPC server listening on {}", grpc_addr);

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, gracefully shutting down...");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
        }
    }

    grpc_handle.abort();

    info!("Steam Dashboard Service shutdown complete");
    Ok(())
}
