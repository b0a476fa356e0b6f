//! Axum router construction.
//!
//! Every route lives under `/api/v1`. CORS allows any origin so the dashboard
//! can poll from wherever it is served, and requests are traced and bounded by
//! the configured timeout.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::transport::handlers;
use crate::transport::state::AppState;
use crate::transport::websocket;

pub const API_PREFIX: &str = "/api/v1";

pub fn build_router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/log", post(handlers::create_log))
        .route("/logs", get(handlers::list_logs))
        .route("/health", get(handlers::health))
        .route("/dataset/info", get(handlers::dataset_info))
        .route("/kaggle/batch", post(handlers::send_dataset_batch))
        .route("/kaggle/{index}", get(handlers::send_dataset_record))
        .route("/topics", get(handlers::list_topics))
        .route("/topics/{topic}/records", get(handlers::read_topic))
        .route("/stream", get(websocket::stream));

    // Timed out requests are answered with 408.
    #[allow(deprecated)]
    let timeout = TimeoutLayer::new(request_timeout);

    Router::new()
        .nest(API_PREFIX, api)
        .layer(timeout)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
