//! URL layout of the service.

use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use tower_http::timeout::TimeoutLayer;

use crate::handlers;
use crate::middleware::log_requests;
use crate::state::AppState;

/// Requests that take longer than `http_timeout` to handle, body read
/// included, are answered with 408.
pub fn app(state: AppState) -> Router {
    let request_timeout = state.config.http_timeout;
    Router::new()
        .route("/", get(handlers::home))
        .route(
            "/todo/",
            get(handlers::list_todos).post(handlers::create_todo),
        )
        .route(
            "/todo",
            get(handlers::list_todos).post(handlers::create_todo),
        )
        .route(
            "/todo/{id}",
            put(handlers::update_todo).delete(handlers::delete_todo),
        )
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}
