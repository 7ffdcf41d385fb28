use std::sync::Arc;

use sqlx::PgPool;

use crate::services::versioning_service::PriceVersioningEngine;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub engine: Arc<PriceVersioningEngine>,
}
