pub mod catalog;
pub mod handlers;
pub mod middleware;
pub mod purchases;
pub mod routes;
pub mod sales;
pub mod store;
pub mod sync;

pub use routes::create_router;

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn api_error(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}
