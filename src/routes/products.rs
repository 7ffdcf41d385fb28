use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{CreateProduct, Product, StoreListing, UpdateProduct};
use crate::services::product_service::{self, ProductWithListings};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/search", get(search_products))
        .route("/price", put(update_store_price))
        .route("/category/:category", get(by_category))
        .route("/brand/:brand", get(by_brand))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    info!("GET /products - Listing products");
    Ok(Json(product_service::list_products(&state.pool).await?))
}

async fn get_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ProductWithListings>, AppError> {
    info!("GET /products/{} - Getting product", id);
    Ok(Json(product_service::get_product(&state.pool, id).await?))
}

async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProduct>,
) -> Result<(StatusCode, Json<ProductWithListings>), AppError> {
    info!("POST /products - Creating product {}", payload.name);
    let created = product_service::create_product(&state.pool, &state.engine, payload)
        .await
        .map_err(|e| {
            error!("Failed to create product: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(changes): Json<UpdateProduct>,
) -> Result<Json<Product>, AppError> {
    info!("PUT /products/{} - Updating product", id);
    Ok(Json(
        product_service::update_product(&state.pool, id, changes).await?,
    ))
}

async fn delete_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /products/{} - Deleting product", id);
    product_service::delete_product(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn by_category(
    Path(category): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, AppError> {
    info!("GET /products/category/{} - Listing by category", category);
    Ok(Json(
        product_service::products_by_category(&state.pool, &category).await?,
    ))
}

async fn by_brand(
    Path(brand): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, AppError> {
    info!("GET /products/brand/{} - Listing by brand", brand);
    Ok(Json(
        product_service::products_by_brand(&state.pool, &brand).await?,
    ))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
}

async fn search_products(
    Query(params): Query<SearchParams>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, AppError> {
    info!("GET /products/search?q={} - Searching products", params.q);
    Ok(Json(
        product_service::search_products(&state.pool, &params.q).await?,
    ))
}

#[derive(Debug, Deserialize)]
struct UpdatePricePayload {
    product_id: Uuid,
    store: String,
    price: BigDecimal,
}

async fn update_store_price(
    State(state): State<AppState>,
    Json(payload): Json<UpdatePricePayload>,
) -> Result<Json<StoreListing>, AppError> {
    let UpdatePricePayload {
        product_id,
        store,
        price,
    } = payload;
    info!(
        "PUT /products/price - New price {} for product {} at {}",
        price, product_id, store
    );
    let listing = product_service::update_store_price(
        &state.pool,
        &state.engine,
        product_id,
        &store,
        price,
    )
    .await
    .map_err(|e| {
        error!(
            "Failed to update price for product {} at {}: {}",
            product_id, store, e
        );
        e
    })?;
    Ok(Json(listing))
}
