use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{PriceInterval, StoreListing};
use crate::store::{IntervalStore, ListingStore};

/// In-memory reference implementation of both store traits. Backs the
/// engine's unit tests and documents the contract the Postgres stores
/// must match.
#[derive(Default)]
pub struct MemoryStore {
    listings: RwLock<HashMap<Uuid, StoreListing>>,
    // Intervals per listing, kept in insertion order. Observations arrive
    // in non-decreasing date order, so insertion order is start order; a
    // stable sort in the queries preserves it for equal starts.
    intervals: RwLock<HashMap<Uuid, Vec<PriceInterval>>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_listing(&self, listing: StoreListing) {
        self.listings.write().insert(listing.id, listing);
    }

    fn sorted(&self, listing_id: Uuid) -> Vec<PriceInterval> {
        let map = self.intervals.read();
        let mut rows = map.get(&listing_id).cloned().unwrap_or_default();
        rows.sort_by_key(|i| i.start_date);
        rows
    }
}

#[async_trait]
impl IntervalStore for MemoryStore {
    async fn find_open_or_current(
        &self,
        listing_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<Option<PriceInterval>, AppError> {
        // Scan from the latest backwards so the survivor of a same-day
        // collapse wins on its shared date.
        Ok(self
            .sorted(listing_id)
            .into_iter()
            .rev()
            .find(|i| i.covers(as_of)))
    }

    async fn find_latest(&self, listing_id: Uuid) -> Result<Option<PriceInterval>, AppError> {
        Ok(self.sorted(listing_id).pop())
    }

    async fn insert(&self, interval: PriceInterval) -> Result<PriceInterval, AppError> {
        let mut map = self.intervals.write();
        let rows = map.entry(interval.store_listing_id).or_default();
        if interval.is_open() && rows.iter().any(|i| i.is_open()) {
            return Err(AppError::Conflict(format!(
                "listing {} already has an open price interval",
                interval.store_listing_id
            )));
        }
        rows.push(interval.clone());
        Ok(interval)
    }

    async fn update(&self, interval: &PriceInterval) -> Result<(), AppError> {
        let mut map = self.intervals.write();
        let row = map
            .get_mut(&interval.store_listing_id)
            .and_then(|rows| rows.iter_mut().find(|i| i.id == interval.id))
            .ok_or_else(|| {
                AppError::NotFound(format!("price interval {} no longer exists", interval.id))
            })?;
        *row = interval.clone();
        Ok(())
    }

    async fn list_ordered_by_start(
        &self,
        listing_id: Uuid,
    ) -> Result<Vec<PriceInterval>, AppError> {
        Ok(self.sorted(listing_id))
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn find(&self, listing_id: Uuid) -> Result<Option<StoreListing>, AppError> {
        Ok(self.listings.read().get(&listing_id).cloned())
    }

    async fn update_standard_price(
        &self,
        listing_id: Uuid,
        price: &BigDecimal,
    ) -> Result<(), AppError> {
        let mut map = self.listings.write();
        let listing = map.get_mut(&listing_id).ok_or_else(|| {
            AppError::NotFound(format!("store listing {} not found", listing_id))
        })?;
        listing.standard_price = price.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn price(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn second_open_insert_conflicts() {
        let store = MemoryStore::new();
        let listing = Uuid::new_v4();
        store
            .insert(PriceInterval::open(listing, date("2024-01-01"), price("10")))
            .await
            .unwrap();
        let err = store
            .insert(PriceInterval::open(listing, date("2024-01-05"), price("11")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn open_inserts_for_different_listings_are_independent() {
        let store = MemoryStore::new();
        store
            .insert(PriceInterval::open(Uuid::new_v4(), date("2024-01-01"), price("10")))
            .await
            .unwrap();
        store
            .insert(PriceInterval::open(Uuid::new_v4(), date("2024-01-01"), price("10")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_of_missing_interval_is_not_found() {
        let store = MemoryStore::new();
        let ghost = PriceInterval::open(Uuid::new_v4(), date("2024-01-01"), price("10"));
        let err = store.update(&ghost).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn open_interval_covers_future_dates() {
        let store = MemoryStore::new();
        let listing = Uuid::new_v4();
        store
            .insert(PriceInterval::open(listing, date("2024-01-01"), price("10")))
            .await
            .unwrap();

        let hit = store
            .find_open_or_current(listing, date("2030-06-01"))
            .await
            .unwrap();
        assert!(hit.is_some());

        let miss = store
            .find_open_or_current(listing, date("2023-12-31"))
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn find_latest_prefers_later_interval_on_equal_start() {
        let store = MemoryStore::new();
        let listing = Uuid::new_v4();
        let mut collapsed = PriceInterval::open(listing, date("2024-02-01"), price("10"));
        collapsed.end_date = Some(date("2024-02-01"));
        store.insert(collapsed).await.unwrap();
        store
            .insert(PriceInterval::open(listing, date("2024-02-01"), price("11")))
            .await
            .unwrap();

        let latest = store.find_latest(listing).await.unwrap().unwrap();
        assert!(latest.is_open());
        assert_eq!(latest.price, price("11"));

        let current = store
            .find_open_or_current(listing, date("2024-02-01"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.price, price("11"));
    }

    #[tokio::test]
    async fn list_is_ordered_by_start() {
        let store = MemoryStore::new();
        let listing = Uuid::new_v4();
        let mut first = PriceInterval::open(listing, date("2024-01-01"), price("10"));
        first.end_date = Some(date("2024-01-09"));
        store.insert(first).await.unwrap();
        store
            .insert(PriceInterval::open(listing, date("2024-01-10"), price("12")))
            .await
            .unwrap();

        let history = store.list_ordered_by_start(listing).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].start_date < history[1].start_date);
    }
}
