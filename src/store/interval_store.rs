use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{PriceInterval, StoreListing};

/// Durable storage of price intervals, as the versioning engine needs it.
///
/// Implementations must enforce one rule at insert time: a listing may
/// hold at most one open interval. A second open insert fails with
/// `AppError::Conflict`, which is the engine's signal that a concurrent
/// writer got there first.
#[async_trait]
pub trait IntervalStore: Send + Sync {
    /// The interval whose range covers `as_of`, or `None`. If the
    /// same-day-collapse state leaves two intervals covering the date,
    /// the later one wins.
    async fn find_open_or_current(
        &self,
        listing_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<Option<PriceInterval>, AppError>;

    /// The interval with the greatest start date, or `None` if the
    /// listing has no history. Ties on start date resolve to the most
    /// recently created interval.
    async fn find_latest(&self, listing_id: Uuid) -> Result<Option<PriceInterval>, AppError>;

    /// Persists a new interval. Fails with `Conflict` if the interval is
    /// open and the listing already has an open interval.
    async fn insert(&self, interval: PriceInterval) -> Result<PriceInterval, AppError>;

    /// Persists a mutation of an existing interval's end date. Fails with
    /// `NotFound` if the interval no longer exists.
    async fn update(&self, interval: &PriceInterval) -> Result<(), AppError>;

    /// Full history, ascending by start date (stable for equal starts).
    async fn list_ordered_by_start(
        &self,
        listing_id: Uuid,
    ) -> Result<Vec<PriceInterval>, AppError>;
}

/// The engine's view of store listings: existence checks and refreshing
/// the denormalized standard price.
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn find(&self, listing_id: Uuid) -> Result<Option<StoreListing>, AppError>;

    async fn update_standard_price(
        &self,
        listing_id: Uuid,
        price: &BigDecimal,
    ) -> Result<(), AppError>;
}
