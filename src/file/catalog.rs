//! File metadata catalog.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db::{cutoff_for, format_timestamp, parse_timestamp};
use crate::{Result, ShareError};

/// Catalog entry for one stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Catalog-assigned ID.
    pub id: i64,
    /// Client-supplied relative path, unsanitized. Display only.
    pub original_name: String,
    /// Location under the content root (`batch_id/sanitized path`).
    pub stored_path: String,
    /// Size in bytes, fixed at ingestion.
    pub size_bytes: u64,
    /// When the file was catalogued.
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct FileRow {
    id: i64,
    original_name: String,
    stored_path: String,
    size_bytes: i64,
    created_at: String,
}

impl TryFrom<FileRow> for FileRecord {
    type Error = ShareError;

    fn try_from(row: FileRow) -> Result<Self> {
        let created_at = parse_timestamp(&row.created_at).ok_or_else(|| {
            ShareError::Database(format!(
                "invalid created_at {:?} for file {}",
                row.created_at, row.id
            ))
        })?;

        Ok(Self {
            id: row.id,
            original_name: row.original_name,
            stored_path: row.stored_path,
            size_bytes: u64::try_from(row.size_bytes).unwrap_or(0),
            created_at,
        })
    }
}

/// Data for cataloguing a new file.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    /// Client-supplied relative path.
    pub original_name: String,
    /// Location under the content root.
    pub stored_path: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Creation time; defaults to the time of insertion.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewFileRecord {
    /// Create a new NewFileRecord.
    pub fn new(
        original_name: impl Into<String>,
        stored_path: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            stored_path: stored_path.into(),
            size_bytes,
            created_at: None,
        }
    }

    /// Set an explicit creation time.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

const SELECT_COLUMNS: &str = "id, original_name, stored_path, size_bytes, created_at";

/// Catalog of shared files backed by the `files` table.
pub struct FileCatalog<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileCatalog<'a> {
    /// Create a new FileCatalog with the given pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a record and return it with its assigned ID.
    pub async fn insert(&self, record: &NewFileRecord) -> Result<FileRecord> {
        let size = i64::try_from(record.size_bytes)
            .map_err(|_| ShareError::Validation("file too large".to_string()))?;
        let created_at = record.created_at.unwrap_or_else(Utc::now);

        let result = sqlx::query(
            "INSERT INTO files (original_name, stored_path, size_bytes, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&record.original_name)
        .bind(&record.stored_path)
        .bind(size)
        .bind(format_timestamp(&created_at))
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get(id)
            .await?
            .ok_or_else(|| ShareError::NotFound(format!("file {id}")))
    }

    /// Get a record by ID, regardless of age.
    pub async fn get(&self, id: i64) -> Result<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(FileRecord::try_from).transpose()
    }

    /// Get a record by ID if it is still inside the retention window.
    pub async fn get_within(&self, id: i64, max_age: Duration) -> Result<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM files WHERE id = ? AND created_at >= ?"
        ))
        .bind(id)
        .bind(cutoff_for(max_age))
        .fetch_optional(self.pool)
        .await?;

        row.map(FileRecord::try_from).transpose()
    }

    /// List records inside the retention window, newest first.
    ///
    /// Ties on `created_at` are broken by descending ID.
    pub async fn list_recent_desc(&self, max_age: Duration) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM files
             WHERE created_at >= ?
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(cutoff_for(max_age))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(FileRecord::try_from).collect()
    }

    /// Delete every record older than the retention window.
    ///
    /// Returns exactly the rows that were deleted, oldest first, so the
    /// caller can remove their backing content.
    pub async fn delete_expired(&self, max_age: Duration) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRow>(&format!(
            "DELETE FROM files WHERE created_at < ? RETURNING {SELECT_COLUMNS}"
        ))
        .bind(cutoff_for(max_age))
        .fetch_all(self.pool)
        .await?;

        let mut records = rows
            .into_iter()
            .map(FileRecord::try_from)
            .collect::<Result<Vec<_>>>()?;
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    /// Delete a single record by ID.
    ///
    /// Returns the deleted record, or None if it didn't exist.
    pub async fn delete(&self, id: i64) -> Result<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRow>(&format!(
            "DELETE FROM files WHERE id = ? RETURNING {SELECT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(FileRecord::try_from).transpose()
    }

    /// Count all records, expired or not.
    #[cfg(test)]
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn hours_ago(hours: i64) -> DateTime<Utc> {
        Utc::now() - chrono::Duration::hours(hours)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = setup_db().await;
        let catalog = FileCatalog::new(db.pool());

        let record = catalog
            .insert(&NewFileRecord::new("a/b/report.mp4", "batch/a/b/report.mp4", 1024))
            .await
            .unwrap();

        assert!(record.id > 0);
        assert_eq!(record.original_name, "a/b/report.mp4");
        assert_eq!(record.stored_path, "batch/a/b/report.mp4");
        assert_eq!(record.size_bytes, 1024);

        let found = catalog.get(record.id).await.unwrap();
        assert_eq!(found, Some(record));
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let db = setup_db().await;
        let catalog = FileCatalog::new(db.pool());

        assert!(catalog.get(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stored_path_is_unique() {
        let db = setup_db().await;
        let catalog = FileCatalog::new(db.pool());

        catalog
            .insert(&NewFileRecord::new("x", "batch/x", 1))
            .await
            .unwrap();
        let dup = catalog.insert(&NewFileRecord::new("x", "batch/x", 1)).await;

        assert!(matches!(dup, Err(ShareError::Database(_))));
    }

    #[tokio::test]
    async fn test_list_recent_desc_orders_and_filters() {
        let db = setup_db().await;
        let catalog = FileCatalog::new(db.pool());

        let old = catalog
            .insert(&NewFileRecord::new("old", "b1/old", 1).with_created_at(hours_ago(30)))
            .await
            .unwrap();
        let mid = catalog
            .insert(&NewFileRecord::new("mid", "b2/mid", 1).with_created_at(hours_ago(5)))
            .await
            .unwrap();
        let new = catalog
            .insert(&NewFileRecord::new("new", "b3/new", 1).with_created_at(hours_ago(1)))
            .await
            .unwrap();

        let listed = catalog.list_recent_desc(DAY).await.unwrap();
        let ids: Vec<i64> = listed.iter().map(|r| r.id).collect();

        assert_eq!(ids, vec![new.id, mid.id]);
        assert!(!ids.contains(&old.id));
    }

    #[tokio::test]
    async fn test_list_recent_desc_breaks_ties_by_id() {
        let db = setup_db().await;
        let catalog = FileCatalog::new(db.pool());
        let at = hours_ago(2);

        let first = catalog
            .insert(&NewFileRecord::new("a", "b/a", 1).with_created_at(at))
            .await
            .unwrap();
        let second = catalog
            .insert(&NewFileRecord::new("b", "b/b", 1).with_created_at(at))
            .await
            .unwrap();

        let listed = catalog.list_recent_desc(DAY).await.unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn test_get_within_hides_expired() {
        let db = setup_db().await;
        let catalog = FileCatalog::new(db.pool());

        let old = catalog
            .insert(&NewFileRecord::new("old", "b/old", 1).with_created_at(hours_ago(25)))
            .await
            .unwrap();

        assert!(catalog.get_within(old.id, DAY).await.unwrap().is_none());
        assert!(catalog.get(old.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_expired_returns_deleted_rows() {
        let db = setup_db().await;
        let catalog = FileCatalog::new(db.pool());

        let oldest = catalog
            .insert(&NewFileRecord::new("1", "b/1", 10).with_created_at(hours_ago(48)))
            .await
            .unwrap();
        let older = catalog
            .insert(&NewFileRecord::new("2", "b/2", 20).with_created_at(hours_ago(25)))
            .await
            .unwrap();
        let fresh = catalog
            .insert(&NewFileRecord::new("3", "b/3", 30))
            .await
            .unwrap();

        let deleted = catalog.delete_expired(DAY).await.unwrap();

        assert_eq!(deleted, vec![oldest, older]);
        assert_eq!(catalog.count().await.unwrap(), 1);
        assert!(catalog.get(fresh.id).await.unwrap().is_some());

        // Nothing left to expire
        assert!(catalog.delete_expired(DAY).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let db = setup_db().await;
        let catalog = FileCatalog::new(db.pool());

        let record = catalog
            .insert(&NewFileRecord::new("f", "b/f", 1))
            .await
            .unwrap();

        assert_eq!(catalog.delete(record.id).await.unwrap(), Some(record.clone()));
        assert_eq!(catalog.delete(record.id).await.unwrap(), None);
    }
}
