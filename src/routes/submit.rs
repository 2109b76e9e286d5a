use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::instrument;

use super::AppState;
use crate::error::ApiError;
use crate::model::UrlRecord;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub url: String,
}

/// Accept only absolute http(s) URLs, trimmed of surrounding whitespace.
fn normalize_url(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("url must not be empty".into()));
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| ApiError::BadRequest(format!("invalid url: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(ApiError::BadRequest(format!(
            "unsupported url scheme: {other}"
        ))),
    }
}

#[instrument(skip_all)]
pub async fn submit_url(
    State(state): State<AppState>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Json<UrlRecord>, ApiError> {
    let url = normalize_url(&payload.url)?;
    let record = state.resolver.submit(&url).await?;
    Ok(Json(record))
}
