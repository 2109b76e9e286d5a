//! Error types shared across the store, cache, resolver and HTTP layers.
//!
//! "Not found" is never an error here: lookups return `Option`. The
//! distinct `StoreError::Conflict` lets the resolver treat a lost creation
//! race as a reason to re-read rather than a failed submission.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record for this URL already exists.
    #[error("url already recorded: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be mapped back into a record.
    #[error("invalid row: {0}")]
    InvalidRow(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The selected backend is missing required settings.
    #[error("cache misconfigured: {0}")]
    Config(&'static str),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The record disappeared between write and re-read.
    #[error("record {0} vanished during resolution")]
    Vanished(i64),
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("service unavailable: {0}")]
    Unavailable(#[from] ResolveError),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unavailable(err) => {
                tracing::error!(error = %err, "backing service failure");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "A backing service is temporarily unavailable. Please try again later."
                        .to_string(),
                )
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
