//! Row shapes returned by the SQL layer.
//!
//! Rows keep the raw storage types (status as text, naive timestamps) and
//! are converted into domain records at the repository boundary.

use crate::error::StoreError;
use crate::model::{UrlRecord, UrlStatus};
use chrono::NaiveDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UrlRecordRow {
    pub id: i64,
    pub url: String,
    pub image_url: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
}

impl TryFrom<UrlRecordRow> for UrlRecord {
    type Error = StoreError;

    fn try_from(row: UrlRecordRow) -> Result<Self, Self::Error> {
        let status = UrlStatus::parse_status(&row.status).ok_or_else(|| {
            StoreError::InvalidRow(format!("record {} has unknown status {}", row.id, row.status))
        })?;
        Ok(UrlRecord {
            id: row.id,
            url: row.url,
            image_url: row.image_url.filter(|s| !s.is_empty()),
            status,
            created_at: row.created_at.and_utc(),
        })
    }
}
