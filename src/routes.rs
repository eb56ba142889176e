use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::error::handle_panic;
use crate::handlers::{
    health_handler, index_handler, metrics_handler, report_handler, report_upload_handler,
    upload_handler,
};
use crate::rate_limit::rate_limit_middleware;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    // submission routes go through admission control first
    let intake = Router::new()
        .route("/report", post(report_handler))
        .route("/report-upload", post(report_upload_handler))
        .route("/upload", post(upload_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(intake)
        .with_state(state);

    apply_layers(app, max_upload_bytes)
}

// Body cap innermost, then panic recovery, then tracing around everything
fn apply_layers(app: Router, max_upload_bytes: usize) -> Router {
    app.layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}
