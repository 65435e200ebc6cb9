//! File service tying sanitizer, content store and catalog together.

use std::collections::HashSet;
use std::time::Duration;

use axum::body::Bytes;
use futures::Stream;
use tracing::{info, warn};

use super::catalog::{FileCatalog, FileRecord, NewFileRecord};
use super::sanitize::{sanitize, SanitizedPath};
use super::storage::ContentStore;
use super::BatchId;
use crate::db::Database;
use crate::{Result, ShareError};

/// One multi-file upload request.
///
/// All parts share the batch id as a namespace, so concurrent uploads never
/// collide. Within a batch the first part wins: a later part whose sanitized
/// path was already written is rejected.
#[derive(Debug, Default)]
pub struct UploadBatch {
    id: BatchId,
    seen: HashSet<SanitizedPath>,
}

impl UploadBatch {
    /// Start a new batch with a fresh id.
    pub fn new() -> Self {
        Self::default()
    }

    /// The batch id.
    pub fn id(&self) -> &BatchId {
        &self.id
    }
}

/// High-level file operations.
pub struct FileService<'a> {
    db: &'a Database,
    store: &'a ContentStore,
    max_age: Duration,
}

impl<'a> FileService<'a> {
    /// Create a new FileService.
    pub fn new(db: &'a Database, store: &'a ContentStore, max_age: Duration) -> Self {
        Self { db, store, max_age }
    }

    /// Ingest one uploaded part.
    ///
    /// The record is inserted only after the content was fully written. If
    /// anything fails, no record exists afterwards and written content is
    /// removed again.
    pub async fn ingest<S, E>(
        &self,
        batch: &mut UploadBatch,
        raw_name: &str,
        stream: S,
    ) -> Result<FileRecord>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: std::error::Error + Send + Sync + 'static,
    {
        let path = sanitize(raw_name)?;
        if batch.seen.contains(&path) {
            return Err(ShareError::Validation(format!(
                "duplicate path {path} in upload batch"
            )));
        }

        let stored = self.store.write(&batch.id, &path, stream).await?;
        batch.seen.insert(path);

        let catalog = FileCatalog::new(self.db.pool());
        let new_record = NewFileRecord::new(raw_name, &stored.stored_path, stored.size_bytes);
        match catalog.insert(&new_record).await {
            Ok(record) => {
                info!(
                    file_id = record.id,
                    stored_path = %record.stored_path,
                    size_bytes = record.size_bytes,
                    "File uploaded"
                );
                Ok(record)
            }
            Err(e) => {
                if let Err(cleanup) = self.store.delete(&stored.stored_path).await {
                    warn!(stored_path = %stored.stored_path, error = %cleanup, "Failed to remove uncatalogued upload");
                }
                Err(e)
            }
        }
    }

    /// Look up a file inside the retention window.
    pub async fn get(&self, id: i64) -> Result<FileRecord> {
        FileCatalog::new(self.db.pool())
            .get_within(id, self.max_age)
            .await?
            .ok_or_else(|| ShareError::NotFound(format!("file {id}")))
    }

    /// List files inside the retention window, newest first.
    pub async fn list_recent(&self) -> Result<Vec<FileRecord>> {
        FileCatalog::new(self.db.pool())
            .list_recent_desc(self.max_age)
            .await
    }

    /// Delete a file and its backing object.
    ///
    /// The catalog row goes first; a missing object afterwards is logged and
    /// otherwise ignored.
    pub async fn delete(&self, id: i64) -> Result<FileRecord> {
        let record = FileCatalog::new(self.db.pool())
            .delete(id)
            .await?
            .ok_or_else(|| ShareError::NotFound(format!("file {id}")))?;

        match self.store.delete(&record.stored_path).await {
            Ok(true) => {}
            Ok(false) => warn!(file_id = id, stored_path = %record.stored_path, "Deleted file had no backing object"),
            Err(e) => warn!(file_id = id, stored_path = %record.stored_path, error = %e, "Failed to delete backing object"),
        }

        info!(file_id = id, "File deleted");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::io;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    async fn setup() -> (TempDir, Database, ContentStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = ContentStore::new(temp_dir.path()).unwrap();
        let db = Database::open_in_memory().await.unwrap();
        (temp_dir, db, store)
    }

    fn body(data: &'static [u8]) -> impl Stream<Item = io::Result<Bytes>> + Unpin {
        stream::iter(vec![Ok(Bytes::from_static(data))])
    }

    #[tokio::test]
    async fn test_ingest_creates_record_and_content() {
        let (_dir, db, store) = setup().await;
        let service = FileService::new(&db, &store, DAY);
        let mut batch = UploadBatch::new();

        let record = service
            .ingest(&mut batch, "photos/../cat.jpg", body(b"meow"))
            .await
            .unwrap();

        assert_eq!(record.original_name, "photos/../cat.jpg");
        assert_eq!(record.stored_path, format!("{}/photos/cat.jpg", batch.id()));
        assert_eq!(record.size_bytes, 4);
        assert_eq!(store.stat(&record.stored_path).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_ingest_rejected_path_creates_nothing() {
        let (_dir, db, store) = setup().await;
        let service = FileService::new(&db, &store, DAY);
        let mut batch = UploadBatch::new();

        let result = service.ingest(&mut batch, "../..", body(b"x")).await;

        assert!(matches!(result, Err(ShareError::InvalidPath(_))));
        assert_eq!(FileCatalog::new(db.pool()).count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ingest_failed_stream_creates_no_record() {
        let (_dir, db, store) = setup().await;
        let service = FileService::new(&db, &store, DAY);
        let mut batch = UploadBatch::new();

        let parts: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"half")),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "aborted")),
        ];
        let result = service
            .ingest(&mut batch, "video.mp4", stream::iter(parts))
            .await;

        assert!(result.is_err());
        assert_eq!(FileCatalog::new(db.pool()).count().await.unwrap(), 0);
        assert!(!store.exists(&format!("{}/video.mp4", batch.id())).await);
    }

    #[tokio::test]
    async fn test_duplicate_path_in_batch_is_rejected() {
        let (_dir, db, store) = setup().await;
        let service = FileService::new(&db, &store, DAY);
        let mut batch = UploadBatch::new();

        let first = service
            .ingest(&mut batch, "dir/same.txt", body(b"first"))
            .await
            .unwrap();
        let second = service
            .ingest(&mut batch, "dir\\same.txt", body(b"second"))
            .await;

        assert!(matches!(second, Err(ShareError::Validation(_))));
        assert_eq!(store.stat(&first.stored_path).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_same_name_in_separate_batches() {
        let (_dir, db, store) = setup().await;
        let service = FileService::new(&db, &store, DAY);

        let a = service
            .ingest(&mut UploadBatch::new(), "same.txt", body(b"a"))
            .await
            .unwrap();
        let b = service
            .ingest(&mut UploadBatch::new(), "same.txt", body(b"b"))
            .await
            .unwrap();

        assert_ne!(a.stored_path, b.stored_path);
        assert_eq!(service.list_recent().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_part_suffix_does_not_shadow_later_upload() {
        let (_dir, db, store) = setup().await;
        let service = FileService::new(&db, &store, DAY);
        let mut batch = UploadBatch::new();

        let part = service
            .ingest(&mut batch, "x.part", body(b"0123456789"))
            .await
            .unwrap();
        let plain = service.ingest(&mut batch, "x", body(b"abc")).await.unwrap();

        assert_eq!(store.stat(&part.stored_path).await.unwrap(), 10);
        assert_eq!(store.stat(&plain.stored_path).await.unwrap(), 3);
        assert_eq!(service.get(part.id).await.unwrap().size_bytes, 10);
        assert_eq!(service.get(plain.id).await.unwrap().size_bytes, 3);
    }

    #[tokio::test]
    async fn test_ingest_name_at_segment_limit() {
        let (_dir, db, store) = setup().await;
        let service = FileService::new(&db, &store, DAY);
        let mut batch = UploadBatch::new();
        let name = format!("{}.mp4", "a".repeat(251));

        let record = service
            .ingest(&mut batch, &name, body(b"frames"))
            .await
            .unwrap();

        assert_eq!(record.stored_path, format!("{}/{name}", batch.id()));
        assert_eq!(store.stat(&record.stored_path).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let (_dir, db, store) = setup().await;
        let service = FileService::new(&db, &store, DAY);

        assert!(matches!(service.get(42).await, Err(ShareError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_row_and_object() {
        let (_dir, db, store) = setup().await;
        let service = FileService::new(&db, &store, DAY);
        let record = service
            .ingest(&mut UploadBatch::new(), "gone.txt", body(b"bye"))
            .await
            .unwrap();

        service.delete(record.id).await.unwrap();

        assert!(matches!(service.get(record.id).await, Err(ShareError::NotFound(_))));
        assert!(!store.exists(&record.stored_path).await);
        assert!(matches!(
            service.delete(record.id).await,
            Err(ShareError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_tolerates_orphaned_record() {
        let (_dir, db, store) = setup().await;
        let service = FileService::new(&db, &store, DAY);
        let record = service
            .ingest(&mut UploadBatch::new(), "orphan.txt", body(b"o"))
            .await
            .unwrap();
        store.delete(&record.stored_path).await.unwrap();

        assert!(service.delete(record.id).await.is_ok());
    }
}
