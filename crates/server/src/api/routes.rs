use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::middleware::metrics_middleware;
use super::{handlers, tickets};
use crate::state::AppState;

/// Largest accepted CSV upload.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        // Tickets
        .route("/ticket", put(tickets::create_ticket))
        .route("/ticket/{id}", get(tickets::get_ticket))
        .route("/ticket/{id}/status", patch(tickets::update_status))
        .route("/ticket/{id}/assignto", patch(tickets::update_assign_to))
        .route("/tickets", get(tickets::get_assigned_tickets))
        .route(
            "/tickets/import",
            post(tickets::import_tickets).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
