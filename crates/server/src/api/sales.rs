//! Admin sales API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::info;

use mediastore_core::{PurchaseError, Sale, SaleFilter, SaleStatus, ShareGrant};

use super::{api_error, middleware::AdminUser};
use crate::state::AppState;

/// A sale with its status and the recording's file name.
#[derive(Debug, Serialize)]
pub struct SaleView {
    #[serde(flatten)]
    pub sale: Sale,
    pub status: SaleStatus,
    /// `None` once the recording has been purged.
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SalesListResponse {
    pub sales: Vec<SaleView>,
    pub total: usize,
}

/// GET /api/v1/sales?mode=&status=
pub async fn list_sales(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<SaleFilter>,
) -> Result<Json<SalesListResponse>, impl IntoResponse> {
    let sales = match state.sales().list(&filter) {
        Ok(sales) => sales,
        Err(e) => return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    };

    let sales: Vec<SaleView> = sales
        .into_iter()
        .map(|sale| SaleView {
            status: sale.status(),
            file_name: state
                .catalog()
                .get(sale.catalog_entry_id)
                .ok()
                .map(|entry| entry.file_name),
            sale,
        })
        .collect();
    let total = sales.len();
    Ok(Json(SalesListResponse { sales, total }))
}

/// POST /api/v1/sales/{id}/share
///
/// Issue a fresh share link for a confirmed sale.
pub async fn renew_share(
    State(state): State<Arc<AppState>>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<ShareGrant>, impl IntoResponse> {
    info!(%user, sale_id = id, "Share renewal requested");

    match state.purchases().renew_share(id).await {
        Ok(grant) => Ok(Json(grant)),
        Err(e @ PurchaseError::NotFound(_)) => Err(api_error(StatusCode::NOT_FOUND, e.to_string())),
        Err(e @ PurchaseError::NotConfirmed(_)) => {
            Err(api_error(StatusCode::CONFLICT, e.to_string()))
        }
        Err(e @ (PurchaseError::Catalog(_) | PurchaseError::Sales(_))) => {
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
        Err(e) => Err(api_error(StatusCode::BAD_GATEWAY, e.to_string())),
    }
}
