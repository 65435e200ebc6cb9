//! Content store for uploaded files.
//!
//! Objects live under a fixed content root, one directory per upload batch:
//! ```text
//! {content_root}/
//! ├── 3f2a9c.../          <- batch id
//! │   ├── report.mp4
//! │   └── a/b/notes.txt
//! ├── 81d04e.../
//! │   └── photo.jpg
//! └── .staging/           <- uploads in progress
//! ```
//!
//! Batch ids are hex, so no stored path can ever address `.staging`.

use std::io;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use super::sanitize::{is_contained, SanitizedPath};
use super::BatchId;
use crate::{Result, ShareError};

/// Directory under the content root holding uploads in progress.
pub const STAGING_DIR: &str = ".staging";

/// Result of a completed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Relative location under the content root (`batch_id/sanitized path`).
    pub stored_path: String,
    /// Number of bytes written.
    pub size_bytes: u64,
}

/// Filesystem-backed content store.
///
/// The store is the sole owner of object bytes; the catalog only keeps
/// `stored_path` references into it.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Create a store rooted at the given directory, creating it if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Get the content root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stream an upload into the store.
    ///
    /// Bytes are written chunk by chunk to a uniquely named file in the
    /// staging directory, which is renamed into place only after the whole
    /// stream succeeded. A failed upload never leaves a truncated object under
    /// its final name, and a staged file can never clobber a stored object.
    pub async fn write<S, E>(
        &self,
        batch: &BatchId,
        path: &SanitizedPath,
        mut stream: S,
    ) -> Result<StoredObject>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: std::error::Error + Send + Sync + 'static,
    {
        let stored_path = format!("{batch}/{path}");
        let final_path = self.path_of(&stored_path)?;
        let temp_path = self.staging_path();

        let mut file = with_parents(&temp_path, || File::create(&temp_path)).await?;
        let mut size_bytes: u64 = 0;

        let written: io::Result<()> = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(io::Error::other)?;
                file.write_all(&chunk).await?;
                size_bytes += chunk.len() as u64;
            }
            file.flush().await?;
            file.sync_all().await
        }
        .await;
        drop(file);

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                warn!(path = %temp_path.display(), error = %cleanup, "Failed to remove partial upload");
            }
            return Err(e.into());
        }

        if let Err(e) = with_parents(&final_path, || fs::rename(&temp_path, &final_path)).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        debug!(stored_path = %stored_path, size_bytes, "Stored object");

        Ok(StoredObject {
            stored_path,
            size_bytes,
        })
    }

    /// Open a stored object for reading.
    pub async fn open(&self, stored_path: &str) -> Result<File> {
        let path = self.path_of(stored_path)?;
        match File::open(&path).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ShareError::NotFound(format!("object {stored_path}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get the size of a stored object.
    pub async fn stat(&self, stored_path: &str) -> Result<u64> {
        let path = self.path_of(stored_path)?;
        match fs::metadata(&path).await {
            Ok(m) if m.is_file() => Ok(m.len()),
            Ok(_) => Err(ShareError::NotFound(format!("object {stored_path}"))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ShareError::NotFound(format!("object {stored_path}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a stored object.
    ///
    /// Returns `true` if the object was deleted, `false` if it didn't exist.
    pub async fn delete(&self, stored_path: &str) -> Result<bool> {
        let path = self.path_of(stored_path)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if an object exists.
    #[cfg(test)]
    pub async fn exists(&self, stored_path: &str) -> bool {
        self.stat(stored_path).await.is_ok()
    }

    /// Fresh location for an upload in progress.
    fn staging_path(&self) -> PathBuf {
        self.root
            .join(STAGING_DIR)
            .join(Uuid::new_v4().simple().to_string())
    }

    /// Resolve a stored path to its location on disk.
    ///
    /// Stored paths come from the catalog; they are re-checked here so a
    /// corrupted row can never address anything outside the root.
    pub fn path_of(&self, stored_path: &str) -> Result<PathBuf> {
        if !is_contained(stored_path) {
            return Err(ShareError::InvalidPath(stored_path.to_string()));
        }
        Ok(self.root.join(stored_path))
    }

    /// Remove directories left empty under the content root.
    ///
    /// Best effort: directories that cannot be read or removed are skipped.
    /// The staging directory is left alone since uploads may be writing to it.
    pub async fn prune_empty_dirs(&self) -> usize {
        let staging = self.root.join(STAGING_DIR);
        let mut removed = 0;
        let mut stack = vec![(self.root.clone(), false)];

        // Post-order walk: children are visited before their parent is checked.
        while let Some((dir, visited)) = stack.pop() {
            if visited {
                if dir != self.root && fs::remove_dir(&dir).await.is_ok() {
                    removed += 1;
                }
                continue;
            }

            stack.push((dir.clone(), true));
            let Ok(mut entries) = fs::read_dir(&dir).await else {
                continue;
            };
            while let Ok(Some(entry)) = entries.next_entry().await {
                if entry.path() == staging {
                    continue;
                }
                if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                    stack.push((entry.path(), false));
                }
            }
        }

        removed
    }
}

/// Run a filesystem operation that needs `path`'s parent to exist.
///
/// Missing parents are created first. The operation is retried once when the
/// parent vanished in between, which happens when
/// [`ContentStore::prune_empty_dirs`] runs concurrently with an upload.
async fn with_parents<T, F, Fut>(path: &Path, mut op: F) -> io::Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = io::Result<T>>,
{
    for attempt in 0..2 {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        match op().await {
            Err(e) if e.kind() == io::ErrorKind::NotFound && attempt == 0 => continue,
            result => return result,
        }
    }
    op().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::sanitize;
    use futures::stream;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn setup_store() -> (TempDir, ContentStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = ContentStore::new(temp_dir.path().join("content")).unwrap();
        (temp_dir, store)
    }

    fn chunks(data: &[u8], size: usize) -> impl Stream<Item = io::Result<Bytes>> + Unpin {
        let parts: Vec<io::Result<Bytes>> = data
            .chunks(size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        stream::iter(parts)
    }

    async fn read_all(store: &ContentStore, stored_path: &str) -> Vec<u8> {
        let mut file = store.open(stored_path).await.unwrap();
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await.unwrap();
        buf
    }

    #[test]
    fn test_new_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("a").join("b");

        let store = ContentStore::new(&root).unwrap();

        assert!(root.is_dir());
        assert_eq!(store.root(), root);
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let (_temp_dir, store) = setup_store();
        let batch = BatchId::new();
        let path = sanitize("a/b/report.bin").unwrap();
        let content: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();

        let stored = store
            .write(&batch, &path, chunks(&content, 4096))
            .await
            .unwrap();

        assert_eq!(stored.stored_path, format!("{batch}/a/b/report.bin"));
        assert_eq!(stored.size_bytes, content.len() as u64);
        assert_eq!(read_all(&store, &stored.stored_path).await, content);
        assert_eq!(store.stat(&stored.stored_path).await.unwrap(), 100_000);
    }

    #[tokio::test]
    async fn test_write_empty_stream() {
        let (_temp_dir, store) = setup_store();
        let batch = BatchId::new();
        let path = sanitize("empty.txt").unwrap();

        let stored = store.write(&batch, &path, chunks(&[], 1)).await.unwrap();

        assert_eq!(stored.size_bytes, 0);
        assert!(read_all(&store, &stored.stored_path).await.is_empty());
    }

    #[tokio::test]
    async fn test_same_name_in_different_batches_does_not_collide() {
        let (_temp_dir, store) = setup_store();
        let path = sanitize("same.txt").unwrap();

        let first = store
            .write(&BatchId::new(), &path, chunks(b"first", 2))
            .await
            .unwrap();
        let second = store
            .write(&BatchId::new(), &path, chunks(b"second", 2))
            .await
            .unwrap();

        assert_ne!(first.stored_path, second.stored_path);
        assert_eq!(read_all(&store, &first.stored_path).await, b"first");
        assert_eq!(read_all(&store, &second.stored_path).await, b"second");
    }

    #[tokio::test]
    async fn test_failed_stream_leaves_nothing_behind() {
        let (_temp_dir, store) = setup_store();
        let batch = BatchId::new();
        let path = sanitize("broken.bin").unwrap();

        let parts: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away")),
        ];

        let result = store.write(&batch, &path, stream::iter(parts)).await;

        assert!(matches!(result, Err(ShareError::Io(_))));
        let stored_path = format!("{batch}/broken.bin");
        assert!(!store.exists(&stored_path).await);
        let staging = store.root().join(STAGING_DIR);
        assert_eq!(std::fs::read_dir(staging).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_open_and_stat_not_found() {
        let (_temp_dir, store) = setup_store();

        assert!(matches!(
            store.open("nope/missing.txt").await,
            Err(ShareError::NotFound(_))
        ));
        assert!(matches!(
            store.stat("nope/missing.txt").await,
            Err(ShareError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_temp_dir, store) = setup_store();
        let stored = store
            .write(&BatchId::new(), &sanitize("x.txt").unwrap(), chunks(b"x", 1))
            .await
            .unwrap();

        assert!(store.delete(&stored.stored_path).await.unwrap());
        assert!(!store.delete(&stored.stored_path).await.unwrap());
        assert!(!store.exists(&stored.stored_path).await);
    }

    #[tokio::test]
    async fn test_rejects_escaping_stored_paths() {
        let (_temp_dir, store) = setup_store();

        for bad in ["../outside.txt", "/etc/passwd", "a/../../b", ""] {
            assert!(matches!(store.path_of(bad), Err(ShareError::InvalidPath(_))));
            assert!(matches!(
                store.delete(bad).await,
                Err(ShareError::InvalidPath(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_prune_empty_dirs() {
        let (_temp_dir, store) = setup_store();
        let keep = store
            .write(&BatchId::new(), &sanitize("keep.txt").unwrap(), chunks(b"k", 1))
            .await
            .unwrap();
        let gone = store
            .write(
                &BatchId::new(),
                &sanitize("deep/nested/gone.txt").unwrap(),
                chunks(b"g", 1),
            )
            .await
            .unwrap();
        store.delete(&gone.stored_path).await.unwrap();

        let removed = store.prune_empty_dirs().await;

        // batch dir, deep, nested
        assert_eq!(removed, 3);
        assert!(store.exists(&keep.stored_path).await);
        assert!(store.root().join(STAGING_DIR).is_dir());
        assert!(store.root().is_dir());
    }

    #[tokio::test]
    async fn test_part_suffixed_name_survives_its_sibling() {
        let (_temp_dir, store) = setup_store();
        let batch = BatchId::new();

        let part = store
            .write(&batch, &sanitize("clip.mp4.part").unwrap(), chunks(b"AAAA", 2))
            .await
            .unwrap();
        let full = store
            .write(&batch, &sanitize("clip.mp4").unwrap(), chunks(b"BB", 2))
            .await
            .unwrap();

        assert_eq!(read_all(&store, &part.stored_path).await, b"AAAA");
        assert_eq!(read_all(&store, &full.stored_path).await, b"BB");
    }

    #[tokio::test]
    async fn test_longest_segment_can_be_written() {
        let (_temp_dir, store) = setup_store();
        let name = format!("{}.mp4", "a".repeat(251));
        let path = sanitize(&name).unwrap();
        assert_eq!(path.file_name().len(), 255);

        let stored = store
            .write(&BatchId::new(), &path, chunks(b"long", 2))
            .await
            .unwrap();

        assert_eq!(read_all(&store, &stored.stored_path).await, b"long");
    }

    #[test]
    fn test_staging_is_unreachable_from_stored_paths() {
        let (_temp_dir, store) = setup_store();
        let staged = store.staging_path();

        assert!(staged.starts_with(store.root().join(STAGING_DIR)));
        assert_ne!(staged, store.staging_path());
        assert!(!BatchId::new().as_str().starts_with('.'));
    }
}
