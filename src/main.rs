use nepo_watch::config::{Config, StorageBackend};
use nepo_watch::database::{create_pool, ensure_schema};
use nepo_watch::events::RedisEventSink;
use nepo_watch::redis::RedisClient;
use nepo_watch::store::{DocumentStore, MemoryStore, PgDocumentStore};
use nepo_watch::{AppState, create_app};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nepo_watch=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Create document store
    let store: Arc<dyn DocumentStore> = match config.storage_backend {
        StorageBackend::Postgres => {
            let database_url = config.database_url.as_deref().unwrap_or_default();
            let db = create_pool(database_url).await?;
            tracing::info!("Database connection pool created");

            ensure_schema(&db).await?;
            tracing::info!("Document schema ready");

            Arc::new(PgDocumentStore::new(db))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // Create Redis client
    let redis = Arc::new(RedisClient::new(&config.redis_url).await?);
    tracing::info!("Redis client created");

    let events = Arc::new(RedisEventSink::new(
        redis.clone(),
        config.analytics_channel.clone(),
    ));

    // Create application state
    let state = AppState {
        store,
        cache: redis,
        events,
        config: Arc::new(config.clone()),
    };

    // Create application
    let app = create_app(state);

    // Create listener
    let listener = TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
    tracing::info!("Server listening on {}:{}", config.host, config.port);

    // Start server
    axum::serve(listener, app).await?;

    Ok(())
}
