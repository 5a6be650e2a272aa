//! Public storefront API handlers.
//!
//! Only active recordings are visible here, and payment ids and remote paths
//! are never exposed.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use mediastore_core::{pricing::format_amount, CatalogEntry, CatalogError};

use super::api_error;
use crate::state::AppState;

/// Message shown to buyers for any server-side failure.
pub(crate) const GENERIC_ERROR: &str = "Something went wrong, please try again later";

#[derive(Debug, Serialize)]
pub struct StoreRecording {
    pub id: i64,
    pub file_name: String,
    pub description: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: u32,
    pub size: String,
    pub thumbnail_url: String,
    pub price_minor: i64,
    pub currency: String,
    pub price_display: String,
    /// Days left before the recording is removed.
    pub available_days: i64,
}

impl StoreRecording {
    fn from_entry(state: &AppState, entry: CatalogEntry) -> Self {
        let price_minor = state.pricing().price(entry.duration_minutes());
        let currency = state.config().payment.currency.clone();
        Self {
            id: entry.id,
            duration_minutes: entry.duration_minutes(),
            available_days: state
                .retention()
                .retention_days_remaining(entry.start_date, Utc::now()),
            price_display: format_amount(price_minor, &currency),
            price_minor,
            currency,
            file_name: entry.file_name,
            description: entry.description,
            date: entry.start_date,
            start_time: entry.start_time,
            end_time: entry.end_time,
            size: entry.size,
            thumbnail_url: entry.thumbnail_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DatesResponse {
    pub dates: Vec<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct RecordingsQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct RecordingsResponse {
    pub date: NaiveDate,
    pub recordings: Vec<StoreRecording>,
}

/// GET /api/v1/store/dates
///
/// Dates with at least one active recording, newest first.
pub async fn list_dates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DatesResponse>, impl IntoResponse> {
    match state.catalog().available_dates() {
        Ok(dates) => Ok(Json(DatesResponse { dates })),
        Err(e) => {
            error!(error = %e, "Listing store dates failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR))
        }
    }
}

/// GET /api/v1/store/recordings?date=YYYY-MM-DD
pub async fn list_recordings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecordingsQuery>,
) -> Result<Json<RecordingsResponse>, impl IntoResponse> {
    match state.catalog().list_by_date(query.date, false) {
        Ok(entries) => Ok(Json(RecordingsResponse {
            date: query.date,
            recordings: entries
                .into_iter()
                .map(|entry| StoreRecording::from_entry(&state, entry))
                .collect(),
        })),
        Err(e) => {
            error!(error = %e, date = %query.date, "Listing store recordings failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR))
        }
    }
}

/// GET /api/v1/store/recordings/{id}
pub async fn get_recording(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<StoreRecording>, impl IntoResponse> {
    match state.catalog().get(id) {
        Ok(entry) if !entry.is_expired() => Ok(Json(StoreRecording::from_entry(&state, entry))),
        Ok(_) | Err(CatalogError::NotFound(_)) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Recording not found: {}", id),
        )),
        Err(e) => {
            error!(error = %e, id, "Loading store recording failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR))
        }
    }
}
