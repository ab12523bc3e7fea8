//! Error types for the todo service.
//!
//! # Design
//! Three layers, matching who can observe the failure:
//! - `StoreError` comes out of the data access layer.
//! - `ApiError` is what a handler returns; it renders itself as an HTTP
//!   response and never escapes the request.
//! - `ServerError` covers process lifecycle (startup, serving, drain) and is
//!   the only kind allowed to terminate the process.
//!
//! Storage failures embed the driver's message in the response body. This
//! leaks implementation detail to clients, but existing callers read the
//! `error` field, so the shape is kept.

use std::time::Duration;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::model::{ErrorBody, Message};

/// Failures raised by a `TodoStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection, query or row-decoding failure reported by the driver.
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// A stored `created_at` value is not in `YYYY-MM-DD HH:MM:SS` form.
    #[error("invalid created_at value {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Per-request failures. Each variant maps to exactly one status code.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The payload decoded but breaks a field rule (empty title).
    #[error("{0}")]
    Validation(String),

    /// The body or path could not be decoded into the expected shape.
    #[error("{message}: {detail}")]
    Decode { message: String, detail: String },

    /// Update/delete matched no row (strict mode only).
    #[error("{0}")]
    NotFound(String),

    #[error("{message}: {source}")]
    Storage {
        message: String,
        #[source]
        source: StoreError,
    },

    /// The home page template could not be loaded or rendered.
    #[error("{0}")]
    Template(String),
}

impl ApiError {
    pub fn decode(message: impl Into<String>, detail: impl ToString) -> Self {
        ApiError::Decode {
            message: message.into(),
            detail: detail.to_string(),
        }
    }

    pub fn storage(message: impl Into<String>, source: StoreError) -> Self {
        ApiError::Storage {
            message: message.into(),
            source,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Decode { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage { .. } | ApiError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation(message) => (status, Json(Message { message })).into_response(),
            ApiError::Decode { message, detail } => {
                warn!(error = %detail, "{message}");
                (status, Json(ErrorBody { message, error: detail })).into_response()
            }
            ApiError::NotFound(message) => {
                let body = ErrorBody {
                    error: "no todo matches the given id".to_string(),
                    message,
                };
                (status, Json(body)).into_response()
            }
            ApiError::Storage { message, source } => {
                error!(error = %source, "{message}");
                let body = ErrorBody {
                    error: source.to_string(),
                    message,
                };
                (status, Json(body)).into_response()
            }
            ApiError::Template(message) => {
                error!("{message}");
                (
                    status,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    message,
                )
                    .into_response()
            }
        }
    }
}

/// Process-level failures. Any of these ends the process.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The database could not be opened or did not answer a ping.
    #[error("storage unavailable at startup: {0}")]
    Startup(#[source] StoreError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped on its own with an I/O error.
    #[error("http server failed: {0}")]
    Serve(#[source] std::io::Error),

    /// In-flight requests were still running when the drain window closed.
    #[error("graceful shutdown did not finish within {0:?}")]
    ShutdownTimeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn validation_renders_message_only() {
        let resp = ApiError::Validation("The title is required".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body, serde_json::json!({"message": "The title is required"}));
    }

    #[tokio::test]
    async fn storage_embeds_driver_text() {
        let err = ApiError::storage(
            "Failed to fetch todos",
            StoreError::Database(sqlx::Error::PoolTimedOut),
        );
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["message"], "Failed to fetch todos");
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn decode_is_bad_request_with_error_field() {
        let resp = ApiError::decode("Invalid todo id", "invalid digit").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["message"], "Invalid todo id");
        assert_eq!(body["error"], "invalid digit");
    }

    #[tokio::test]
    async fn template_is_plain_text() {
        let resp = ApiError::Template("Error loading template".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_string(resp).await, "Error loading template");
    }
}
