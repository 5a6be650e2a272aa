//! Admin catalog API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::Serialize;

use mediastore_core::{pricing::format_amount, CatalogEntry, CatalogStats};

use super::api_error;
use crate::state::AppState;

/// A catalog row with its derived retention and price.
#[derive(Debug, Serialize)]
pub struct AdminCatalogEntry {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub retention_days_remaining: i64,
    pub price_minor: i64,
    pub price_display: String,
}

#[derive(Debug, Serialize)]
pub struct CatalogListResponse {
    pub entries: Vec<AdminCatalogEntry>,
    pub total: usize,
}

/// GET /api/v1/catalog
///
/// Every catalog row, expired ones included.
pub async fn list_catalog(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CatalogListResponse>, impl IntoResponse> {
    let now = Utc::now();
    let currency = &state.config().payment.currency;

    match state.catalog().list_all() {
        Ok(entries) => {
            let entries: Vec<AdminCatalogEntry> = entries
                .into_iter()
                .map(|entry| {
                    let price_minor = state.pricing().price(entry.duration_minutes());
                    AdminCatalogEntry {
                        retention_days_remaining: state
                            .retention()
                            .retention_days_remaining(entry.start_date, now),
                        price_minor,
                        price_display: format_amount(price_minor, currency),
                        entry,
                    }
                })
                .collect();
            let total = entries.len();
            Ok(Json(CatalogListResponse { entries, total }))
        }
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// GET /api/v1/catalog/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CatalogStats>, impl IntoResponse> {
    state
        .catalog()
        .stats()
        .map(Json)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
