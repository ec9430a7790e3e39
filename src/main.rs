//! Library lending server
//!
//! Serves the lending engine over REST and the tool adapter.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use library_lending::{
    api,
    clock::SystemClock,
    config::{AppConfig, StoreBackend},
    repository::{MemoryStore, PgStore, Store},
    AppState, LendingEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("library_lending={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting library lending server v{}", env!("CARGO_PKG_VERSION"));

    let lock_timeout = Duration::from_millis(config.store.lock_timeout_ms);

    // Open the store
    let store: Arc<dyn Store> = match config.store.backend {
        StoreBackend::Postgres => {
            let store = PgStore::connect(&config.database, lock_timeout)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");

            store.migrate().await.context("Failed to run database migrations")?;
            tracing::info!("Database migrations completed");

            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, data is lost on shutdown");
            Arc::new(MemoryStore::new(lock_timeout))
        }
    };

    let engine = LendingEngine::new(store, Arc::new(SystemClock), config.lending.clone());

    if config.store.seed_demo_data {
        engine.seed_demo_data().await.context("Failed to seed demo data")?;
    }

    // Save server address before moving config
    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        engine: Arc::new(engine),
    };

    // Build router
    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
