//! Inventory sync API handlers.
//!
//! Sync is triggered from outside (cron, systemd timer); there is no
//! in-process scheduler.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use mediastore_core::{SyncError, SyncReport};

use super::{api_error, middleware::AdminUser};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub cleared: u64,
}

/// POST /api/v1/sync
///
/// Run one sync pass and return its counts.
pub async fn run_sync(
    State(state): State<Arc<AppState>>,
    AdminUser(user): AdminUser,
) -> Result<Json<SyncReport>, impl IntoResponse> {
    info!(%user, "Sync requested");

    match state.synchronizer().sync().await {
        Ok(report) => Ok(Json(report)),
        Err(e @ SyncError::Transport(_)) => Err(api_error(StatusCode::BAD_GATEWAY, e.to_string())),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// POST /api/v1/shares/cleanup
///
/// Clear share links whose expiry has passed.
pub async fn cleanup_shares(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CleanupResponse>, impl IntoResponse> {
    let today = state.retention().today(Utc::now());
    match state.synchronizer().cleanup_expired_shares(today) {
        Ok(cleared) => Ok(Json(CleanupResponse { cleared })),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
