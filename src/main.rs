use anyhow::Context;
use clap::Parser;
use rinha_dispatch::app::{Cli, Config, Pipeline, StorageBackend};
use rinha_dispatch::handlers;
use rinha_dispatch::services::{PaymentProcessorClient, ProcessorTransport};
use rinha_dispatch::storage::{InMemoryStore, PaymentStore, PgStore, StatusStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli).context("invalid configuration")?;
    info!("Starting payment dispatcher on port {}", config.server_port);

    let (payments, statuses): (Arc<dyn PaymentStore>, Arc<dyn StatusStore>) = match config.storage_backend {
        StorageBackend::Postgres => {
            let store = PgStore::connect(&config)
                .await
                .context("storage unavailable at startup")?;
            store.ensure_schema().await.context("failed to prepare schema")?;
            let store = Arc::new(store);
            let payments: Arc<dyn PaymentStore> = store.clone();
            let statuses: Arc<dyn StatusStore> = store;
            (payments, statuses)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; payments are lost on restart");
            let store = Arc::new(InMemoryStore::new());
            let payments: Arc<dyn PaymentStore> = store.clone();
            let statuses: Arc<dyn StatusStore> = store;
            (payments, statuses)
        }
    };

    let transport: Arc<dyn ProcessorTransport> =
        Arc::new(PaymentProcessorClient::new(&config).context("failed to build HTTP client")?);

    let pipeline = Pipeline::start(&config, payments, statuses, transport).await;
    let app = handlers::router(pipeline.service.clone());

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    pipeline.shutdown().await.context("failed to flush pending payments")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
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
    info!("Shutdown signal received");
}
