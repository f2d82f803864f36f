use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{downloads, handlers, middleware::metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Downloads (signals from the acquisition side)
        .route(
            "/downloads",
            get(downloads::get_status).post(downloads::add_download),
        )
        .route("/downloads/refresh", post(downloads::force_refresh))
        .route("/downloads/{id}/complete", post(downloads::complete_download))
        .route("/downloads/{id}/fail", post(downloads::fail_download));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
