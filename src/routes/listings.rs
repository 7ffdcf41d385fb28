use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{CreateStoreListing, StoreListing};
use crate::services::listing_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_listings))
        .route("/active", get(active_listings))
        .route("/store/:store", get(by_store))
        .route(
            "/product/:product_id",
            get(by_product).post(create_listing),
        )
        .route("/:id", get(get_listing).delete(delete_listing))
}

async fn list_listings(State(state): State<AppState>) -> Result<Json<Vec<StoreListing>>, AppError> {
    info!("GET /listings - Listing store listings");
    Ok(Json(listing_service::list_listings(&state.pool).await?))
}

async fn get_listing(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<StoreListing>, AppError> {
    info!("GET /listings/{} - Getting listing", id);
    Ok(Json(listing_service::get_listing(&state.pool, id).await?))
}

async fn by_product(
    Path(product_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<StoreListing>>, AppError> {
    info!("GET /listings/product/{} - Listings for product", product_id);
    Ok(Json(
        listing_service::listings_by_product(&state.pool, product_id).await?,
    ))
}

async fn by_store(
    Path(store): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<StoreListing>>, AppError> {
    info!("GET /listings/store/{} - Listings for store", store);
    Ok(Json(
        listing_service::listings_by_store(&state.pool, &store).await?,
    ))
}

async fn active_listings(
    State(state): State<AppState>,
) -> Result<Json<Vec<StoreListing>>, AppError> {
    info!("GET /listings/active - Active listings");
    Ok(Json(listing_service::active_listings(&state.pool).await?))
}

async fn create_listing(
    Path(product_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<CreateStoreListing>,
) -> Result<(StatusCode, Json<StoreListing>), AppError> {
    info!(
        "POST /listings/product/{} - Onboarding at {}",
        product_id, payload.store
    );
    let listing =
        listing_service::create_listing(&state.pool, &state.engine, product_id, payload)
            .await
            .map_err(|e| {
                error!("Failed to create listing for product {}: {}", product_id, e);
                e
            })?;
    Ok((StatusCode::CREATED, Json(listing)))
}

async fn delete_listing(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /listings/{} - Deleting listing", id);
    listing_service::delete_listing(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
