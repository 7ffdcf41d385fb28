use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// A store's offering of a product. `standard_price` is denormalized: it
// always equals the price of the listing's open interval and is refreshed
// by the versioning engine on every accepted observation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoreListing {
    pub id: Uuid,
    pub product_id: Uuid,
    pub store: String,
    pub standard_price: BigDecimal,
    pub product_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl StoreListing {
    pub fn new(product_id: Uuid, payload: &CreateStoreListing) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            store: payload.store.clone(),
            standard_price: payload.standard_price.clone(),
            product_url: payload.product_url.clone(),
            is_active: payload.is_active.unwrap_or(true),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStoreListing {
    pub store: String,
    pub standard_price: BigDecimal,
    pub product_url: Option<String>,
    pub is_active: Option<bool>,
}
