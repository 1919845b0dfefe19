use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ticketdesk_core::config::StorageConfig;
use ticketdesk_core::ticket::ASSIGNED_TO_ATTRIBUTE;
use ticketdesk_core::{
    load_config, validate_config, DocumentStore, DynamoDbDocumentStore, MemoryDocumentStore,
    SqliteDocumentStore, StorageBackend, StoreTicketRepository, TicketRepository,
};
use ticketdesk_server::api::create_router;
use ticketdesk_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("TICKETDESK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!(
        backend = config.storage.backend.as_str(),
        "Configuration loaded successfully"
    );

    // The store is built once and shared by every request
    let store = build_document_store(&config.storage).await?;
    let repository: Arc<dyn TicketRepository> = Arc::new(StoreTicketRepository::new(store));

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(repository));
    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn build_document_store(config: &StorageConfig) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory document store; tickets are lost on exit");
            Arc::new(MemoryDocumentStore::new(ASSIGNED_TO_ATTRIBUTE))
        }
        StorageBackend::Sqlite => {
            info!("Opening SQLite document store at {:?}", config.sqlite.path);
            Arc::new(
                SqliteDocumentStore::new(&config.sqlite.path, ASSIGNED_TO_ATTRIBUTE)
                    .context("Failed to open SQLite document store")?,
            )
        }
        StorageBackend::Dynamodb => {
            let store =
                DynamoDbDocumentStore::from_env(&config.dynamodb, ASSIGNED_TO_ATTRIBUTE).await;
            info!(
                table = store.table_name(),
                index = %config.dynamodb.index_name,
                "Using DynamoDB document store"
            );
            Arc::new(store)
        }
    };

    Ok(store)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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

    info!("Shutdown signal received");
}
