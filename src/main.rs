mod app;
mod db;
mod errors;
mod logging;
mod models;
mod routes;
mod services;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use crate::services::versioning_service::PriceVersioningEngine;
use crate::state::AppState;
use crate::store::postgres::{PgIntervalStore, PgListingStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    logging::init_logging(logging::LoggingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let engine = Arc::new(PriceVersioningEngine::new(
        Arc::new(PgListingStore::new(pool.clone())),
        Arc::new(PgIntervalStore::new(pool.clone())),
    ));
    let state = AppState { pool, engine };
    let app = app::create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 PriceByte backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
