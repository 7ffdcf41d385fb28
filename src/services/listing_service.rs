use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{CreateStoreListing, StoreListing};
use crate::services::versioning_service::{ensure_non_negative_price, PriceVersioningEngine};

pub async fn list_listings(pool: &PgPool) -> Result<Vec<StoreListing>, AppError> {
    Ok(db::listing_queries::fetch_all(pool).await?)
}

pub async fn get_listing(pool: &PgPool, listing_id: Uuid) -> Result<StoreListing, AppError> {
    db::listing_queries::fetch_by_id(pool, listing_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store listing {} not found", listing_id)))
}

pub async fn listings_by_product(
    pool: &PgPool,
    product_id: Uuid,
) -> Result<Vec<StoreListing>, AppError> {
    Ok(db::listing_queries::fetch_by_product(pool, product_id).await?)
}

pub async fn listings_by_store(pool: &PgPool, store: &str) -> Result<Vec<StoreListing>, AppError> {
    Ok(db::listing_queries::fetch_by_store(pool, store).await?)
}

pub async fn active_listings(pool: &PgPool) -> Result<Vec<StoreListing>, AppError> {
    Ok(db::listing_queries::fetch_active(pool).await?)
}

/// Checks an onboarding payload before anything is persisted, so a bad
/// price cannot leave a listing row behind with no history.
pub(crate) fn validate_new_listing(payload: &CreateStoreListing) -> Result<(), AppError> {
    if payload.store.trim().is_empty() {
        return Err(AppError::Validation("store name must not be empty".into()));
    }
    ensure_non_negative_price(&payload.standard_price)
}

/// Onboards a product to a store and seeds its price history.
pub async fn create_listing(
    pool: &PgPool,
    engine: &PriceVersioningEngine,
    product_id: Uuid,
    payload: CreateStoreListing,
) -> Result<StoreListing, AppError> {
    validate_new_listing(&payload)?;
    if db::product_queries::fetch_by_id(pool, product_id).await?.is_none() {
        return Err(AppError::NotFound(format!("product {} not found", product_id)));
    }

    let listing = StoreListing::new(product_id, &payload);
    db::listing_queries::insert(pool, &listing).await?;
    engine
        .record_observation(listing.id, listing.standard_price.clone(), None)
        .await?;
    Ok(listing)
}

/// Removes a listing; its price intervals go with it (cascade).
pub async fn delete_listing(pool: &PgPool, listing_id: Uuid) -> Result<(), AppError> {
    let affected = db::listing_queries::delete(pool, listing_id).await?;
    if affected == 0 {
        return Err(AppError::NotFound(format!("store listing {} not found", listing_id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn payload(store: &str, price: &str) -> CreateStoreListing {
        CreateStoreListing {
            store: store.into(),
            standard_price: BigDecimal::from_str(price).unwrap(),
            product_url: None,
            is_active: None,
        }
    }

    #[test]
    fn negative_standard_price_is_rejected_before_persistence() {
        let err = validate_new_listing(&payload("TestMart", "-4.99")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn blank_store_name_is_rejected() {
        let err = validate_new_listing(&payload("  ", "4.99")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn well_formed_payload_passes() {
        validate_new_listing(&payload("TestMart", "4.99")).unwrap();
        validate_new_listing(&payload("TestMart", "0")).unwrap();
    }
}
