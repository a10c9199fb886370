//! Route table.

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/fines/trigger-processing",
            post(handlers::trigger_processing::trigger_processing),
        )
        .route(
            "/api/fines/{id}/document-url",
            get(handlers::document_url::get_document_url),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
