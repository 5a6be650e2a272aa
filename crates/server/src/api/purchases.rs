//! Storefront purchase API handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::{error, info};

use mediastore_core::{CheckoutRedirect, PurchaseError, SaleResult};

use super::{api_error, store::GENERIC_ERROR, ErrorResponse};
use crate::metrics::BOT_REJECTIONS_TOTAL;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub catalog_id: i64,
    /// Hidden form field. Humans leave it empty.
    #[serde(default)]
    pub special_field: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    pub session_id: String,
}

/// Map a pipeline error to what the buyer sees.
fn buyer_error(e: PurchaseError) -> (StatusCode, Json<ErrorResponse>) {
    match e {
        PurchaseError::NotFound(what) => api_error(StatusCode::NOT_FOUND, format!("Not found: {}", what)),
        other => {
            error!(error = %other, "Purchase step failed");
            api_error(StatusCode::BAD_GATEWAY, GENERIC_ERROR)
        }
    }
}

/// POST /api/v1/purchases
///
/// Start a purchase and return the hosted checkout URL.
pub async fn create_purchase(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PurchaseRequest>,
) -> Result<(StatusCode, Json<CheckoutRedirect>), impl IntoResponse> {
    if request
        .special_field
        .as_deref()
        .is_some_and(|v| !v.trim().is_empty())
    {
        BOT_REJECTIONS_TOTAL.inc();
        info!(catalog_id = request.catalog_id, "Purchase rejected by honeypot");
        return Err(api_error(StatusCode::BAD_REQUEST, "Request rejected"));
    }

    state
        .purchases()
        .initiate_purchase(request.catalog_id)
        .await
        .map(|redirect| (StatusCode::CREATED, Json(redirect)))
        .map_err(buyer_error)
}

/// GET /api/v1/purchases/confirm?session_id=...
///
/// Called when the processor sends the buyer back. Safe to repeat.
pub async fn confirm_purchase(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConfirmQuery>,
) -> Result<Json<SaleResult>, impl IntoResponse> {
    if query.session_id.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "session_id is required"));
    }

    state
        .purchases()
        .confirm_purchase(&query.session_id)
        .await
        .map(Json)
        .map_err(buyer_error)
}
