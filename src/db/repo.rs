use super::model::UrlRecordRow;
use crate::error::StoreError;
use crate::model::{UrlRecord, UrlStatus};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::instrument;

pub type Pool = SqlitePool;

const RECORD_COLUMNS: &str = "id, url, image_url, status, created_at";

pub async fn init_pool(database_url: &str) -> Result<Pool, StoreError> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    sqlx::query("PRAGMA journal_mode=WAL;").execute(&pool).await?;
    sqlx::query("PRAGMA synchronous=FULL;").execute(&pool).await?;
    Ok(pool)
}

/// Normalise a file-backed SQLite URL: expand a leading `~/` and make sure
/// the parent directory exists. In-memory and non-sqlite URLs pass through.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }

    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    let path = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    match query {
        Some(q) => format!("sqlite://{}?{}", path, q),
        None => format!("sqlite://{}", path),
    }
}

pub async fn run_migrations(pool: &Pool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Durable table of submitted URLs and their resolution state.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new `pending` record. Fails with [`StoreError::Conflict`] when
    /// the URL is already recorded.
    async fn create(&self, url: &str) -> Result<UrlRecord, StoreError>;

    async fn get_by_url(&self, url: &str) -> Result<Option<UrlRecord>, StoreError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<UrlRecord>, StoreError>;

    /// Overwrite `image_url` and `status`. Unknown ids are ignored.
    async fn update(
        &self,
        id: i64,
        image_url: Option<&str>,
        status: UrlStatus,
    ) -> Result<(), StoreError>;

    /// Up to `limit` records ordered by id, starting at `cursor` inclusive.
    /// The second element is the id of the first record past this page.
    async fn list_page(
        &self,
        limit: u32,
        cursor: Option<i64>,
        descending: bool,
    ) -> Result<(Vec<UrlRecord>, Option<i64>), StoreError>;
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool,
}

impl SqliteStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() || db_err.message().contains("UNIQUE constraint")
        }
        _ => false,
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    #[instrument(skip_all)]
    async fn create(&self, url: &str) -> Result<UrlRecord, StoreError> {
        let row = sqlx::query_as::<_, UrlRecordRow>(&format!(
            "INSERT INTO url_records (url, status) VALUES (?, ?) RETURNING {RECORD_COLUMNS}"
        ))
        .bind(url)
        .bind(UrlStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await;

        match row {
            Ok(row) => row.try_into(),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict(url.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    #[instrument(skip_all)]
    async fn get_by_url(&self, url: &str) -> Result<Option<UrlRecord>, StoreError> {
        sqlx::query_as::<_, UrlRecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM url_records WHERE url = ?"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?
        .map(UrlRecord::try_from)
        .transpose()
    }

    #[instrument(skip_all)]
    async fn get_by_id(&self, id: i64) -> Result<Option<UrlRecord>, StoreError> {
        sqlx::query_as::<_, UrlRecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM url_records WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(UrlRecord::try_from)
        .transpose()
    }

    #[instrument(skip_all)]
    async fn update(
        &self,
        id: i64,
        image_url: Option<&str>,
        status: UrlStatus,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE url_records SET image_url = ?, status = ? WHERE id = ?")
            .bind(image_url)
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn list_page(
        &self,
        limit: u32,
        cursor: Option<i64>,
        descending: bool,
    ) -> Result<(Vec<UrlRecord>, Option<i64>), StoreError> {
        let (bound, order) = if descending {
            ("id <= ?", "DESC")
        } else {
            ("id >= ?", "ASC")
        };
        let filter = if cursor.is_some() {
            format!("WHERE {bound}")
        } else {
            String::new()
        };
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM url_records {filter} ORDER BY id {order} LIMIT ?"
        );

        let mut query = sqlx::query_as::<_, UrlRecordRow>(&sql);
        if let Some(cursor) = cursor {
            query = query.bind(cursor);
        }
        // one extra row tells us whether another page exists
        let rows = query
            .bind(i64::from(limit) + 1)
            .fetch_all(&self.pool)
            .await?;

        let mut records = rows
            .into_iter()
            .map(UrlRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let next_cursor = if records.len() > limit as usize {
            records.pop().map(|extra| extra.id)
        } else {
            None
        };
        Ok((records, next_cursor))
    }
}
