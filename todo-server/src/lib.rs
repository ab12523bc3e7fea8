//! HTTP service exposing CRUD over a single `todos` table.
//!
//! # Overview
//! `GET /` serves a static page; `/todo/` lists and creates items and
//! `/todo/{id}` updates and deletes them. Every call round-trips to the
//! database; the service keeps no in-process state besides the connection
//! pool.
//!
//! # Design
//! - The store and configuration travel in [`AppState`], injected through
//!   `Router::with_state`; there are no process-wide globals.
//! - Handlers convert every failure into an [`ApiError`] response with a
//!   4xx/5xx status and a `{"message","error"}` body.
//! - [`Server`] owns the listener and drains in-flight requests on shutdown
//!   within a fixed window.
//! - Slow clients are bounded by `http_timeout`: on header reads (idle
//!   keep-alive included) by the connection, on the rest of the request by
//!   the router.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod model;
pub mod routes;
pub mod server;
pub mod state;

pub use config::Config;
pub use db::{Store, TodoStore};
pub use error::{ApiError, ServerError, StoreError};
pub use model::Todo;
pub use routes::app;
pub use server::{shutdown_signal, Lifecycle, Server};
pub use state::AppState;

use std::future::Future;

use tokio::net::TcpListener;

/// Serve the todo API on `listener` until `shutdown` resolves.
pub async fn run(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send,
) -> Result<(), ServerError> {
    let server = Server::new(state.config.shutdown_timeout)
        .with_header_read_timeout(state.config.http_timeout);
    server.serve(listener, app(state), shutdown).await
}
