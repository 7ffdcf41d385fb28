use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{PriceInterval, StoreListing};
use crate::store::{IntervalStore, ListingStore};

/// Postgres-backed interval store. The "at most one open interval per
/// listing" rule lives in the schema as a partial unique index
/// (`uq_price_intervals_open`); a unique violation surfaces as `Conflict`.
pub struct PgIntervalStore {
    pool: PgPool,
}

impl PgIntervalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IntervalStore for PgIntervalStore {
    async fn find_open_or_current(
        &self,
        listing_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<Option<PriceInterval>, AppError> {
        Ok(db::interval_queries::fetch_covering(&self.pool, listing_id, as_of).await?)
    }

    async fn find_latest(&self, listing_id: Uuid) -> Result<Option<PriceInterval>, AppError> {
        Ok(db::interval_queries::fetch_latest(&self.pool, listing_id).await?)
    }

    async fn insert(&self, interval: PriceInterval) -> Result<PriceInterval, AppError> {
        match db::interval_queries::insert(&self.pool, &interval).await {
            Ok(()) => Ok(interval),
            Err(e) if is_unique_violation(&e) => Err(AppError::Conflict(format!(
                "listing {} already has an open price interval",
                interval.store_listing_id
            ))),
            Err(e) => Err(AppError::Db(e)),
        }
    }

    async fn update(&self, interval: &PriceInterval) -> Result<(), AppError> {
        let affected = db::interval_queries::update_end_date(&self.pool, interval).await?;
        if affected == 0 {
            return Err(AppError::NotFound(format!(
                "price interval {} no longer exists",
                interval.id
            )));
        }
        Ok(())
    }

    async fn list_ordered_by_start(
        &self,
        listing_id: Uuid,
    ) -> Result<Vec<PriceInterval>, AppError> {
        Ok(db::interval_queries::fetch_ordered_by_start(&self.pool, listing_id).await?)
    }
}

pub struct PgListingStore {
    pool: PgPool,
}

impl PgListingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    async fn find(&self, listing_id: Uuid) -> Result<Option<StoreListing>, AppError> {
        Ok(db::listing_queries::fetch_by_id(&self.pool, listing_id).await?)
    }

    async fn update_standard_price(
        &self,
        listing_id: Uuid,
        price: &BigDecimal,
    ) -> Result<(), AppError> {
        let affected =
            db::listing_queries::update_standard_price(&self.pool, listing_id, price).await?;
        if affected == 0 {
            return Err(AppError::NotFound(format!(
                "store listing {} not found",
                listing_id
            )));
        }
        Ok(())
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}
