use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::StoreListing;

pub async fn insert(pool: &PgPool, listing: &StoreListing) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO store_listings (id, product_id, store, standard_price, product_url, is_active, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(listing.id)
    .bind(listing.product_id)
    .bind(&listing.store)
    .bind(&listing.standard_price)
    .bind(&listing.product_url)
    .bind(listing.is_active)
    .bind(listing.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn fetch_all(pool: &PgPool) -> Result<Vec<StoreListing>, sqlx::Error> {
    sqlx::query_as::<_, StoreListing>(
        "SELECT id, product_id, store, standard_price, product_url, is_active, created_at
         FROM store_listings
         ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn fetch_by_id(
    pool: &PgPool,
    listing_id: Uuid,
) -> Result<Option<StoreListing>, sqlx::Error> {
    sqlx::query_as::<_, StoreListing>(
        "SELECT id, product_id, store, standard_price, product_url, is_active, created_at
         FROM store_listings
         WHERE id = $1",
    )
    .bind(listing_id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_by_product(
    pool: &PgPool,
    product_id: Uuid,
) -> Result<Vec<StoreListing>, sqlx::Error> {
    sqlx::query_as::<_, StoreListing>(
        "SELECT id, product_id, store, standard_price, product_url, is_active, created_at
         FROM store_listings
         WHERE product_id = $1
         ORDER BY store ASC",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_by_store(pool: &PgPool, store: &str) -> Result<Vec<StoreListing>, sqlx::Error> {
    sqlx::query_as::<_, StoreListing>(
        "SELECT id, product_id, store, standard_price, product_url, is_active, created_at
         FROM store_listings
         WHERE LOWER(store) = LOWER($1)
         ORDER BY created_at DESC",
    )
    .bind(store)
    .fetch_all(pool)
    .await
}

/// Case-insensitive store match, as the price-update entry point expects.
pub async fn fetch_by_product_and_store(
    pool: &PgPool,
    product_id: Uuid,
    store: &str,
) -> Result<Option<StoreListing>, sqlx::Error> {
    sqlx::query_as::<_, StoreListing>(
        "SELECT id, product_id, store, standard_price, product_url, is_active, created_at
         FROM store_listings
         WHERE product_id = $1 AND LOWER(store) = LOWER($2)",
    )
    .bind(product_id)
    .bind(store)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_active(pool: &PgPool) -> Result<Vec<StoreListing>, sqlx::Error> {
    sqlx::query_as::<_, StoreListing>(
        "SELECT id, product_id, store, standard_price, product_url, is_active, created_at
         FROM store_listings
         WHERE is_active = TRUE
         ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn update_standard_price(
    pool: &PgPool,
    listing_id: Uuid,
    price: &BigDecimal,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE store_listings SET standard_price = $1 WHERE id = $2")
        .bind(price)
        .bind(listing_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete(pool: &PgPool, listing_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM store_listings WHERE id = $1")
        .bind(listing_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
