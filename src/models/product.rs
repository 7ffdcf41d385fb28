use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::store_listing::CreateStoreListing;

// A catalogued product, independent of any store's offering of it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub size: Option<f64>,
    pub unit: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(payload: &CreateProduct) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: payload.name.clone(),
            brand: payload.brand.clone(),
            category: payload.category.clone(),
            size: payload.size,
            unit: payload.unit.clone(),
            image_url: payload.image_url.clone(),
            description: payload.description.clone(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub size: Option<f64>,
    pub unit: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    /// Store listings to onboard together with the product; each seeds
    /// its own price history.
    #[serde(default)]
    pub listings: Vec<CreateStoreListing>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub size: Option<f64>,
    pub unit: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
}
