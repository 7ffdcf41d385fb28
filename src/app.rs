use axum::Router;
use tower_http::cors::CorsLayer;

use crate::routes::{health, listings, prices, products};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/products", products::router())
        .nest("/api/listings", listings::router())
        .nest("/api/prices", prices::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
