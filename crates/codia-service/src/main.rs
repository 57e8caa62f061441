//! Codia Service - HTTP API for credits and generation proxies.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codia_service::{create_router, AppState, ServiceConfig, StoreBackend};
use codia_store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,codia=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Codia Service");

    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        store_backend = ?config.store_backend,
        jwt_secret_configured = %config.auth_jwt_secret.is_some(),
        admin_api_enabled = %config.admin_api_key.is_some(),
        provider_configured = %config.provider.api_key.is_some(),
        "Service configuration loaded"
    );

    let store = open_store(&config).await?;

    let state = AppState::new(store, config.clone());
    let app = create_router(state);

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL is required for the postgres backend")?;
            tracing::info!("Connecting to PostgreSQL");
            let store = PgStore::connect(url, config.database_max_connections).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        StoreBackend::RocksDb => open_rocks(config),
    }
}

#[cfg(feature = "rocksdb-backend")]
fn open_rocks(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    Ok(Arc::new(codia_store::RocksStore::open(&config.data_dir)?))
}

#[cfg(not(feature = "rocksdb-backend"))]
fn open_rocks(_config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    Err("this build does not include the rocksdb-backend feature".into())
}
