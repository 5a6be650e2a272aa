use std::sync::Arc;

use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use super::{
    catalog, handlers,
    middleware::{auth_middleware, metrics_middleware},
    purchases, sales, store, sync,
};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let thumbnail_dir = state.config().store.thumbnail_dir.clone();

    // Admin routes, behind the configured authenticator
    let admin_routes = Router::new()
        .route("/config", get(handlers::get_config))
        .route("/sync", post(sync::run_sync))
        .route("/shares/cleanup", post(sync::cleanup_shares))
        .route("/catalog", get(catalog::list_catalog))
        .route("/catalog/stats", get(catalog::get_stats))
        .route("/sales", get(sales::list_sales))
        .route("/sales/{id}/share", post(sales::renew_share))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Storefront routes, called from the public shop page
    let store_routes = Router::new()
        .route("/store/dates", get(store::list_dates))
        .route("/store/recordings", get(store::list_recordings))
        .route("/store/recordings/{id}", get(store::get_recording))
        .route("/purchases", post(purchases::create_purchase))
        .route("/purchases/confirm", get(purchases::confirm_purchase))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE]),
        );

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::get_metrics))
        .merge(admin_routes)
        .merge(store_routes)
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest_service("/thumbs", ServeDir::new(thumbnail_dir))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
