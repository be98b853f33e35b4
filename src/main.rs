use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use applytrack::api::router;
use applytrack::catalog::{CatalogConfig, HttpCatalog, ProgramCatalog, StaticCatalog};
use applytrack::services::Engine;
use applytrack::state::AppState;
use applytrack::store::{ApplicationStore, MemoryStore, SqliteStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "applytrack=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Backend selection happens once, here; the engine only ever sees the port.
    let store: Arc<dyn ApplicationStore> = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = SqlitePoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("using sqlite store at {}", database_url);
            Arc::new(SqliteStore::new(pool))
        }
        Err(_) => {
            info!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let catalog: Arc<dyn ProgramCatalog> = match CatalogConfig::new_from_env() {
        Ok(config) => {
            info!("using remote catalog at {}", config.base_url);
            Arc::new(HttpCatalog::new(config)?)
        }
        Err(_) => Arc::new(StaticCatalog::bundled()?),
    };

    let user_id = std::env::var("APPLYTRACK_USER").unwrap_or_else(|_| "local".to_string());
    let engine = Engine::load(user_id, store, catalog).await?;

    let app = router(AppState {
        engine: Arc::new(engine),
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
