use bigdecimal::BigDecimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{CreateProduct, Product, StoreListing, UpdateProduct};
use crate::services::listing_service::validate_new_listing;
use crate::services::versioning_service::PriceVersioningEngine;

#[derive(Debug, Serialize)]
pub struct ProductWithListings {
    #[serde(flatten)]
    pub product: Product,
    pub listings: Vec<StoreListing>,
}

pub async fn list_products(pool: &PgPool) -> Result<Vec<Product>, AppError> {
    Ok(db::product_queries::fetch_all(pool).await?)
}

pub async fn get_product(pool: &PgPool, product_id: Uuid) -> Result<ProductWithListings, AppError> {
    let product = db::product_queries::fetch_by_id(pool, product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {} not found", product_id)))?;
    let listings = db::listing_queries::fetch_by_product(pool, product_id).await?;
    Ok(ProductWithListings { product, listings })
}

/// Checks the whole onboarding payload, nested listings included, before
/// the first row is written.
fn validate_new_product(payload: &CreateProduct) -> Result<(), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("product name must not be empty".into()));
    }
    for listing in &payload.listings {
        validate_new_listing(listing)?;
    }
    Ok(())
}

/// Onboards a product together with its store listings. Each listing's
/// initial standard price is recorded through the versioning engine, so
/// history starts with an open interval from day one.
pub async fn create_product(
    pool: &PgPool,
    engine: &PriceVersioningEngine,
    payload: CreateProduct,
) -> Result<ProductWithListings, AppError> {
    validate_new_product(&payload)?;

    let product = Product::new(&payload);
    db::product_queries::insert(pool, &product).await.map_err(|e| {
        error!("Failed to insert product {}: {}", product.name, e);
        AppError::Db(e)
    })?;

    let mut listings = Vec::with_capacity(payload.listings.len());
    for listing_payload in &payload.listings {
        let listing = StoreListing::new(product.id, listing_payload);
        db::listing_queries::insert(pool, &listing).await.map_err(|e| {
            error!(
                "Failed to insert listing for product {} at {}: {}",
                product.id, listing.store, e
            );
            AppError::Db(e)
        })?;
        engine
            .record_observation(listing.id, listing.standard_price.clone(), None)
            .await?;
        listings.push(listing);
    }

    Ok(ProductWithListings { product, listings })
}

pub async fn update_product(
    pool: &PgPool,
    product_id: Uuid,
    changes: UpdateProduct,
) -> Result<Product, AppError> {
    let affected = db::product_queries::update(pool, product_id, &changes).await?;
    if affected == 0 {
        return Err(AppError::NotFound(format!("product {} not found", product_id)));
    }
    db::product_queries::fetch_by_id(pool, product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {} not found", product_id)))
}

pub async fn delete_product(pool: &PgPool, product_id: Uuid) -> Result<(), AppError> {
    let affected = db::product_queries::delete(pool, product_id).await?;
    if affected == 0 {
        return Err(AppError::NotFound(format!("product {} not found", product_id)));
    }
    Ok(())
}

pub async fn products_by_category(pool: &PgPool, category: &str) -> Result<Vec<Product>, AppError> {
    Ok(db::product_queries::fetch_by_category(pool, category).await?)
}

pub async fn products_by_brand(pool: &PgPool, brand: &str) -> Result<Vec<Product>, AppError> {
    Ok(db::product_queries::fetch_by_brand(pool, brand).await?)
}

pub async fn search_products(pool: &PgPool, query: &str) -> Result<Vec<Product>, AppError> {
    Ok(db::product_queries::search_by_name(pool, query).await?)
}

/// Records a new price for a product at a named store (case-insensitive
/// match), the entry point the ingestion collaborator uses.
pub async fn update_store_price(
    pool: &PgPool,
    engine: &PriceVersioningEngine,
    product_id: Uuid,
    store: &str,
    price: BigDecimal,
) -> Result<StoreListing, AppError> {
    let listing = db::listing_queries::fetch_by_product_and_store(pool, product_id, store)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "no listing for product {} at store {}",
                product_id, store
            ))
        })?;

    engine.record_observation(listing.id, price, None).await?;

    db::listing_queries::fetch_by_id(pool, listing.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store listing {} not found", listing.id)))
}
