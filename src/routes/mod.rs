//! HTTP surface.
//!
//! - `POST /api/submit` - resolve a URL to its preview image
//! - `GET /api/history` - newest-first submissions, cursor paginated
//! - `GET /health` - liveness check

mod health;
mod history;
mod submit;

use axum::routing::{get, post};
use axum::Router;

use crate::resolver::Resolver;

pub use history::{HistoryQuery, MAX_HISTORY_LIMIT};
pub use submit::SubmitRequest;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Resolver,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/submit", post(submit::submit_url))
        .route("/api/history", get(history::get_history))
        .with_state(state)
}
