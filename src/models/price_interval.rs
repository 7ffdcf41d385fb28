use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One validity period of a listing's price. Both bounds are inclusive
/// calendar dates; `end_date = None` marks the open interval, valid from
/// `start_date` through today and every future observation until a
/// differing price closes it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PriceInterval {
    pub id: Uuid,
    pub store_listing_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub price: BigDecimal,
    pub created_at: DateTime<Utc>,
}

impl PriceInterval {
    /// A new open interval starting at `start_date`.
    pub fn open(store_listing_id: Uuid, start_date: NaiveDate, price: BigDecimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            store_listing_id,
            start_date,
            end_date: None,
            price,
            created_at: Utc::now(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }

    /// Whether this interval's validity range contains `date`. An open
    /// interval covers every date at or after its start, including
    /// future ones.
    pub fn covers(&self, date: NaiveDate) -> bool {
        if date < self.start_date {
            return false;
        }
        match self.end_date {
            None => true,
            Some(end) => date <= end,
        }
    }
}

/// A price observation as reported by a caller (the CRUD layer or the
/// ingestion collaborator). The date defaults to today when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceObservation {
    pub price: BigDecimal,
    pub date: Option<NaiveDate>,
}
