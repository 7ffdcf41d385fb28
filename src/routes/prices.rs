use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{PriceInterval, PriceObservation};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:listing_id", get(get_history))
        .route("/:listing_id/current", get(get_current_price))
        .route("/:listing_id/observations", post(record_observation))
}

#[derive(Debug, Deserialize)]
struct AsOfParams {
    date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct CurrentPrice {
    listing_id: Uuid,
    date: NaiveDate,
    price: bigdecimal::BigDecimal,
}

async fn get_history(
    Path(listing_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<PriceInterval>>, AppError> {
    info!("GET /prices/{} - Getting price history", listing_id);
    let history = state.engine.history(listing_id).await.map_err(|e| {
        error!("Failed to get price history for {}: {}", listing_id, e);
        e
    })?;
    Ok(Json(history))
}

async fn get_current_price(
    Path(listing_id): Path<Uuid>,
    Query(params): Query<AsOfParams>,
    State(state): State<AppState>,
) -> Result<Json<CurrentPrice>, AppError> {
    let date = params.date.unwrap_or_else(|| chrono::Utc::now().date_naive());
    info!("GET /prices/{}/current - Price as of {}", listing_id, date);
    let price = state.engine.price_as_of(listing_id, Some(date)).await?;
    Ok(Json(CurrentPrice {
        listing_id,
        date,
        price,
    }))
}

async fn record_observation(
    Path(listing_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(observation): Json<PriceObservation>,
) -> Result<(StatusCode, Json<PriceInterval>), AppError> {
    info!(
        "POST /prices/{}/observations - Recording price {}",
        listing_id, observation.price
    );
    let interval = state
        .engine
        .record_observation(listing_id, observation.price, observation.date)
        .await
        .map_err(|e| {
            error!("Failed to record observation for {}: {}", listing_id, e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(interval)))
}
