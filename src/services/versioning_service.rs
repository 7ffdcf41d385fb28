use std::cmp::max;
use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use chrono::{Duration, NaiveDate, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::PriceInterval;
use crate::store::{IntervalStore, ListingStore};

/// Maintains each listing's price history as a gap-free, non-overlapping
/// sequence of validity intervals, and answers point-in-time lookups.
///
/// Writes for one listing are serialized two ways: in-process by a keyed
/// mutex, and across processes by the store's one-open-interval-per-listing
/// rule, whose `Conflict` triggers a single re-read-and-retry.
pub struct PriceVersioningEngine {
    listings: Arc<dyn ListingStore>,
    intervals: Arc<dyn IntervalStore>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

struct Applied {
    interval: PriceInterval,
    mutated: bool,
}

/// Shared by the engine and the onboarding services, so a bad price is
/// rejected before anything touches storage.
pub(crate) fn ensure_non_negative_price(price: &BigDecimal) -> Result<(), AppError> {
    if *price < BigDecimal::zero() {
        return Err(AppError::Validation(format!(
            "price must be non-negative, got {}",
            price
        )));
    }
    Ok(())
}

impl PriceVersioningEngine {
    pub fn new(listings: Arc<dyn ListingStore>, intervals: Arc<dyn IntervalStore>) -> Self {
        Self {
            listings,
            intervals,
            locks: DashMap::new(),
        }
    }

    /// Records a price observation for a listing, closing and opening
    /// intervals as needed, and refreshes the listing's cached standard
    /// price. Returns the interval now valid at the observation date.
    ///
    /// `date` defaults to today. Observations must arrive in
    /// non-decreasing date order per listing; an earlier date fails with
    /// `OutOfOrder`. A same-day observation at a different price
    /// collapses the previous interval to a single-day record: the last
    /// observation of a day wins for future dates.
    pub async fn record_observation(
        &self,
        listing_id: Uuid,
        price: BigDecimal,
        date: Option<NaiveDate>,
    ) -> Result<PriceInterval, AppError> {
        ensure_non_negative_price(&price)?;
        let date = date.unwrap_or_else(|| Utc::now().date_naive());

        self.listings
            .find(listing_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("store listing {} not found", listing_id)))?;

        let lock = self.locks.entry(listing_id).or_default().clone();
        let result = async {
            let _guard = lock.lock().await;

            let applied = match self.apply(listing_id, &price, date).await {
                // A concurrent writer from another process slipped past
                // the lock; re-read the latest interval and retry once.
                Err(AppError::Conflict(_)) => self.apply(listing_id, &price, date).await?,
                other => other?,
            };

            if applied.mutated {
                self.listings
                    .update_standard_price(listing_id, &price)
                    .await?;
            }
            Ok(applied.interval)
        }
        .await;

        // Evict the registry entry once nothing else holds or waits on
        // it, so the map tracks active listings rather than every
        // listing ever observed.
        drop(lock);
        self.locks
            .remove_if(&listing_id, |_, l| Arc::strong_count(l) == 1);

        result
    }

    /// One pass of the versioning algorithm against the current store
    /// state. Callers hold the per-listing lock.
    async fn apply(
        &self,
        listing_id: Uuid,
        price: &BigDecimal,
        date: NaiveDate,
    ) -> Result<Applied, AppError> {
        let latest = match self.intervals.find_latest(listing_id).await? {
            None => {
                // First observation ever: open-ended from day one.
                let opened = self
                    .intervals
                    .insert(PriceInterval::open(listing_id, date, price.clone()))
                    .await?;
                return Ok(Applied {
                    interval: opened,
                    mutated: true,
                });
            }
            Some(latest) => latest,
        };

        if date < latest.start_date {
            return Err(AppError::OutOfOrder(format!(
                "observation for {} predates the current interval starting {}",
                date, latest.start_date
            )));
        }

        if latest.price == *price {
            return match latest.end_date {
                // Confirmation of the open price: nothing to do.
                None => Ok(Applied {
                    interval: latest,
                    mutated: false,
                }),
                // A closed latest interval should not normally be seen,
                // but an equal price just extends it rather than adding
                // a duplicate row.
                Some(end) => {
                    if end >= date {
                        return Ok(Applied {
                            interval: latest,
                            mutated: false,
                        });
                    }
                    let mut extended = latest;
                    extended.end_date = Some(date);
                    self.intervals.update(&extended).await?;
                    Ok(Applied {
                        interval: extended,
                        mutated: true,
                    })
                }
            };
        }

        // Price changed: the old interval's validity stops the day before
        // the observation, clamped so a same-day change leaves a
        // single-day record instead of a negative-length interval.
        let mut closed = latest;
        closed.end_date = Some(max(closed.start_date, date - Duration::days(1)));
        self.intervals.update(&closed).await?;

        let opened = self
            .intervals
            .insert(PriceInterval::open(listing_id, date, price.clone()))
            .await?;
        Ok(Applied {
            interval: opened,
            mutated: true,
        })
    }

    /// The price valid at `date` (today when omitted). Fails with
    /// `NotFound` if no interval covers the date, e.g. before the
    /// listing's first observation.
    pub async fn price_as_of(
        &self,
        listing_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<BigDecimal, AppError> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        self.intervals
            .find_open_or_current(listing_id, date)
            .await?
            .map(|interval| interval.price)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "no recorded price for listing {} on {}",
                    listing_id, date
                ))
            })
    }

    /// Full price history, ascending by start date.
    pub async fn history(&self, listing_id: Uuid) -> Result<Vec<PriceInterval>, AppError> {
        self.intervals.list_ordered_by_start(listing_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateStoreListing, StoreListing};
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn price(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    fn seed_listing(store: &MemoryStore) -> Uuid {
        let listing = StoreListing::new(
            Uuid::new_v4(),
            &CreateStoreListing {
                store: "TestMart".into(),
                standard_price: price("0"),
                product_url: None,
                is_active: None,
            },
        );
        let id = listing.id;
        store.add_listing(listing);
        id
    }

    fn engine(store: &Arc<MemoryStore>) -> PriceVersioningEngine {
        PriceVersioningEngine::new(store.clone(), store.clone())
    }

    #[tokio::test]
    async fn first_observation_opens_an_interval() {
        let store = MemoryStore::new();
        let engine = engine(&store);
        let listing = seed_listing(&store);

        engine
            .record_observation(listing, price("10.00"), Some(date("2024-01-01")))
            .await
            .unwrap();

        let history = engine.history(listing).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].start_date, date("2024-01-01"));
        assert_eq!(history[0].end_date, None);
        assert_eq!(history[0].price, price("10.00"));
    }

    #[tokio::test]
    async fn price_change_closes_previous_interval_the_day_before() {
        let store = MemoryStore::new();
        let engine = engine(&store);
        let listing = seed_listing(&store);

        engine
            .record_observation(listing, price("10.00"), Some(date("2024-01-01")))
            .await
            .unwrap();
        engine
            .record_observation(listing, price("12.00"), Some(date("2024-01-10")))
            .await
            .unwrap();

        let history = engine.history(listing).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].end_date, Some(date("2024-01-09")));
        assert_eq!(history[0].price, price("10.00"));
        assert_eq!(history[1].start_date, date("2024-01-10"));
        assert_eq!(history[1].end_date, None);
        assert_eq!(history[1].price, price("12.00"));
    }

    #[tokio::test]
    async fn equal_price_on_open_interval_is_idempotent() {
        let store = MemoryStore::new();
        let engine = engine(&store);
        let listing = seed_listing(&store);

        engine
            .record_observation(listing, price("10.00"), Some(date("2024-01-01")))
            .await
            .unwrap();
        engine
            .record_observation(listing, price("12.00"), Some(date("2024-01-10")))
            .await
            .unwrap();
        engine
            .record_observation(listing, price("12.00"), Some(date("2024-01-15")))
            .await
            .unwrap();
        engine
            .record_observation(listing, price("12.00"), Some(date("2024-01-15")))
            .await
            .unwrap();

        let history = engine.history(listing).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].end_date, None);
    }

    #[tokio::test]
    async fn same_day_conflicting_observation_collapses_to_single_day() {
        let store = MemoryStore::new();
        let engine = engine(&store);
        let listing = seed_listing(&store);

        engine
            .record_observation(listing, price("10.00"), Some(date("2024-02-01")))
            .await
            .unwrap();
        engine
            .record_observation(listing, price("11.00"), Some(date("2024-02-01")))
            .await
            .unwrap();

        let history = engine.history(listing).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].start_date, date("2024-02-01"));
        assert_eq!(history[0].end_date, Some(date("2024-02-01")));
        assert_eq!(history[0].price, price("10.00"));
        assert_eq!(history[1].start_date, date("2024-02-01"));
        assert_eq!(history[1].end_date, None);
        assert_eq!(history[1].price, price("11.00"));

        // The last observation of the day owns the date going forward.
        let now = engine
            .price_as_of(listing, Some(date("2024-02-01")))
            .await
            .unwrap();
        assert_eq!(now, price("11.00"));
    }

    #[tokio::test]
    async fn backdated_observation_is_rejected() {
        let store = MemoryStore::new();
        let engine = engine(&store);
        let listing = seed_listing(&store);

        engine
            .record_observation(listing, price("10.00"), Some(date("2024-01-01")))
            .await
            .unwrap();
        engine
            .record_observation(listing, price("12.00"), Some(date("2024-01-10")))
            .await
            .unwrap();

        let err = engine
            .record_observation(listing, price("9.00"), Some(date("2024-01-05")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OutOfOrder(_)));

        // Nothing changed.
        assert_eq!(engine.history(listing).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn price_before_first_interval_is_not_found() {
        let store = MemoryStore::new();
        let engine = engine(&store);
        let listing = seed_listing(&store);

        let err = engine
            .price_as_of(listing, Some(date("2023-12-31")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        engine
            .record_observation(listing, price("10.00"), Some(date("2024-01-01")))
            .await
            .unwrap();
        let err = engine
            .price_as_of(listing, Some(date("2023-12-31")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn negative_price_is_rejected() {
        let store = MemoryStore::new();
        let engine = engine(&store);
        let listing = seed_listing(&store);

        let err = engine
            .record_observation(listing, price("-1.50"), Some(date("2024-01-01")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_listing_is_not_found() {
        let store = MemoryStore::new();
        let engine = engine(&store);

        let err = engine
            .record_observation(Uuid::new_v4(), price("10.00"), Some(date("2024-01-01")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn price_as_of_round_trips_through_the_interval() {
        let store = MemoryStore::new();
        let engine = engine(&store);
        let listing = seed_listing(&store);

        engine
            .record_observation(listing, price("10.00"), Some(date("2024-01-01")))
            .await
            .unwrap();
        engine
            .record_observation(listing, price("12.00"), Some(date("2024-01-10")))
            .await
            .unwrap();

        for day in 1..10 {
            let d = date("2024-01-01") + Duration::days(day - 1);
            assert_eq!(
                engine.price_as_of(listing, Some(d)).await.unwrap(),
                price("10.00"),
                "wrong price on {}",
                d
            );
        }
        assert_eq!(
            engine
                .price_as_of(listing, Some(date("2024-01-10")))
                .await
                .unwrap(),
            price("12.00")
        );
        // The open interval covers arbitrarily far ahead.
        assert_eq!(
            engine
                .price_as_of(listing, Some(date("2030-01-01")))
                .await
                .unwrap(),
            price("12.00")
        );
    }

    #[tokio::test]
    async fn history_stays_contiguous_and_non_overlapping() {
        let store = MemoryStore::new();
        let engine = engine(&store);
        let listing = seed_listing(&store);

        let observations = [
            ("10.00", "2024-01-01"),
            ("10.00", "2024-01-03"),
            ("11.50", "2024-01-07"),
            ("11.50", "2024-01-07"),
            ("9.99", "2024-01-08"),
            ("9.99", "2024-02-01"),
            ("14.00", "2024-02-20"),
        ];
        for (p, d) in observations {
            engine
                .record_observation(listing, price(p), Some(date(d)))
                .await
                .unwrap();
        }

        let history = engine.history(listing).await.unwrap();
        assert_eq!(history.len(), 4);
        for pair in history.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            assert!(prev.start_date < next.start_date);
            let end = prev.end_date.expect("only the last interval may be open");
            assert!(prev.start_date <= end);
            // No gap and no overlap between neighbors.
            assert_eq!(end + Duration::days(1), next.start_date);
        }
        assert!(history.last().unwrap().is_open());
    }

    #[tokio::test]
    async fn equal_price_on_a_closed_latest_interval_extends_it() {
        let store = MemoryStore::new();
        let engine = engine(&store);
        let listing = seed_listing(&store);

        // A closed latest interval should not normally exist; seed one
        // directly to exercise the defensive path.
        let mut interval = PriceInterval::open(listing, date("2024-01-01"), price("10.00"));
        interval.end_date = Some(date("2024-01-05"));
        IntervalStore::insert(store.as_ref(), interval).await.unwrap();

        engine
            .record_observation(listing, price("10.00"), Some(date("2024-01-09")))
            .await
            .unwrap();

        let history = engine.history(listing).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].end_date, Some(date("2024-01-09")));
    }

    #[tokio::test]
    async fn cached_standard_price_follows_observations() {
        let store = MemoryStore::new();
        let engine = engine(&store);
        let listing = seed_listing(&store);

        engine
            .record_observation(listing, price("10.00"), Some(date("2024-01-01")))
            .await
            .unwrap();
        engine
            .record_observation(listing, price("12.00"), Some(date("2024-01-10")))
            .await
            .unwrap();

        let cached = ListingStore::find(store.as_ref(), listing)
            .await
            .unwrap()
            .unwrap()
            .standard_price;
        assert_eq!(cached, price("12.00"));
    }

    #[tokio::test]
    async fn observation_date_defaults_to_today() {
        let store = MemoryStore::new();
        let engine = engine(&store);
        let listing = seed_listing(&store);

        engine
            .record_observation(listing, price("10.00"), None)
            .await
            .unwrap();

        let history = engine.history(listing).await.unwrap();
        assert_eq!(history[0].start_date, Utc::now().date_naive());
        assert_eq!(
            engine.price_as_of(listing, None).await.unwrap(),
            price("10.00")
        );
    }

    /// Interval store that fails the first `failures` inserts with
    /// `Conflict`, simulating a concurrent writer in another process.
    struct FlakyIntervalStore {
        inner: Arc<MemoryStore>,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl IntervalStore for FlakyIntervalStore {
        async fn find_open_or_current(
            &self,
            listing_id: Uuid,
            as_of: NaiveDate,
        ) -> Result<Option<PriceInterval>, AppError> {
            self.inner.find_open_or_current(listing_id, as_of).await
        }

        async fn find_latest(
            &self,
            listing_id: Uuid,
        ) -> Result<Option<PriceInterval>, AppError> {
            self.inner.find_latest(listing_id).await
        }

        async fn insert(&self, interval: PriceInterval) -> Result<PriceInterval, AppError> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(AppError::Conflict("simulated concurrent insert".into()));
            }
            self.inner.insert(interval).await
        }

        async fn update(&self, interval: &PriceInterval) -> Result<(), AppError> {
            self.inner.update(interval).await
        }

        async fn list_ordered_by_start(
            &self,
            listing_id: Uuid,
        ) -> Result<Vec<PriceInterval>, AppError> {
            self.inner.list_ordered_by_start(listing_id).await
        }
    }

    #[tokio::test]
    async fn single_conflict_is_retried_and_succeeds() {
        let inner = MemoryStore::new();
        let listing = seed_listing(&inner);
        let flaky = Arc::new(FlakyIntervalStore {
            inner: inner.clone(),
            failures: AtomicUsize::new(1),
        });
        let engine = PriceVersioningEngine::new(inner.clone(), flaky);

        engine
            .record_observation(listing, price("10.00"), Some(date("2024-01-01")))
            .await
            .unwrap();
        assert_eq!(engine.history(listing).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn second_conflict_surfaces_to_the_caller() {
        let inner = MemoryStore::new();
        let listing = seed_listing(&inner);
        let flaky = Arc::new(FlakyIntervalStore {
            inner: inner.clone(),
            failures: AtomicUsize::new(2),
        });
        let engine = PriceVersioningEngine::new(inner.clone(), flaky);

        let err = engine
            .record_observation(listing, price("10.00"), Some(date("2024-01-01")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn lock_registry_is_evicted_after_each_observation() {
        let store = MemoryStore::new();
        let engine = engine(&store);
        let listing = seed_listing(&store);

        engine
            .record_observation(listing, price("10.00"), Some(date("2024-01-01")))
            .await
            .unwrap();
        assert!(engine.locks.is_empty());

        // Eviction also runs when the observation fails.
        let _ = engine
            .record_observation(listing, price("9.00"), Some(date("2023-12-01")))
            .await
            .unwrap_err();
        assert!(engine.locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_same_listing_observations_keep_invariants() {
        let store = MemoryStore::new();
        let engine = Arc::new(PriceVersioningEngine::new(store.clone(), store.clone()));
        let listing = seed_listing(&store);
        let day = date("2024-03-01");

        // Same-day observations at distinct prices from concurrent
        // tasks: every write races on the close-then-open sequence, and
        // the per-listing lock must serialize them.
        let mut handles = Vec::new();
        for cents in 1..=16i64 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .record_observation(listing, price(&format!("10.{:02}", cents)), Some(day))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let history = engine.history(listing).await.unwrap();
        assert_eq!(history.len(), 16);

        let open: Vec<_> = history.iter().filter(|i| i.is_open()).collect();
        assert_eq!(open.len(), 1, "exactly one open interval may survive");
        assert!(history.last().unwrap().is_open());
        for closed in history.iter().filter(|i| !i.is_open()) {
            // Each superseded same-day observation collapses to a
            // single-day record.
            assert_eq!(closed.start_date, day);
            assert_eq!(closed.end_date, Some(day));
        }

        // The cached standard price and the point-in-time lookup both
        // agree with whichever observation won.
        let winner = open[0].price.clone();
        assert_eq!(
            engine.price_as_of(listing, Some(day)).await.unwrap(),
            winner
        );
        let cached = ListingStore::find(store.as_ref(), listing)
            .await
            .unwrap()
            .unwrap()
            .standard_price;
        assert_eq!(cached, winner);
        assert!(engine.locks.is_empty());
    }
}
