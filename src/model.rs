use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing state of a submitted URL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UrlStatus {
    Pending,
    Success,
    Failed,
}

impl UrlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlStatus::Pending => "pending",
            UrlStatus::Success => "success",
            UrlStatus::Failed => "failed",
        }
    }

    pub fn parse_status(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(UrlStatus::Pending),
            "success" => Some(UrlStatus::Success),
            "failed" => Some(UrlStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UrlRecord {
    pub id: i64,
    pub url: String,
    pub image_url: Option<String>,
    pub status: UrlStatus,
    pub created_at: DateTime<Utc>,
}

/// One page of cursor-paginated results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub next_cursor: Option<i64>,
}
