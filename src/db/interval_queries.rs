use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::PriceInterval;

// Runtime-checked queries throughout this layer: the bigdecimal and
// nullable-date bindings don't play well with compile-time verification.

pub async fn insert(pool: &PgPool, interval: &PriceInterval) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO price_intervals (id, store_listing_id, start_date, end_date, price, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(interval.id)
    .bind(interval.store_listing_id)
    .bind(interval.start_date)
    .bind(interval.end_date)
    .bind(&interval.price)
    .bind(interval.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn fetch_covering(
    pool: &PgPool,
    listing_id: Uuid,
    as_of: NaiveDate,
) -> Result<Option<PriceInterval>, sqlx::Error> {
    // Covering-date predicate as in the original history lookup; the
    // descending order makes the survivor of a same-day collapse win.
    sqlx::query_as::<_, PriceInterval>(
        r#"
        SELECT id, store_listing_id, start_date, end_date, price, created_at
        FROM price_intervals
        WHERE store_listing_id = $1
          AND start_date <= $2
          AND (end_date IS NULL OR end_date >= $2)
        ORDER BY start_date DESC, created_at DESC
        LIMIT 1
        "#,
    )
    .bind(listing_id)
    .bind(as_of)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_latest(
    pool: &PgPool,
    listing_id: Uuid,
) -> Result<Option<PriceInterval>, sqlx::Error> {
    sqlx::query_as::<_, PriceInterval>(
        r#"
        SELECT id, store_listing_id, start_date, end_date, price, created_at
        FROM price_intervals
        WHERE store_listing_id = $1
        ORDER BY start_date DESC, created_at DESC
        LIMIT 1
        "#,
    )
    .bind(listing_id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_ordered_by_start(
    pool: &PgPool,
    listing_id: Uuid,
) -> Result<Vec<PriceInterval>, sqlx::Error> {
    sqlx::query_as::<_, PriceInterval>(
        r#"
        SELECT id, store_listing_id, start_date, end_date, price, created_at
        FROM price_intervals
        WHERE store_listing_id = $1
        ORDER BY start_date ASC, created_at ASC
        "#,
    )
    .bind(listing_id)
    .fetch_all(pool)
    .await
}

/// Updates an interval's end date; returns how many rows matched so the
/// caller can surface a vanished interval.
pub async fn update_end_date(
    pool: &PgPool,
    interval: &PriceInterval,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE price_intervals SET end_date = $1 WHERE id = $2")
        .bind(interval.end_date)
        .bind(interval.id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
