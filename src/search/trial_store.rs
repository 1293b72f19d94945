//! Trial memoization store
//!
//! Keyed by `(size, seed)`, values are JSON-encoded design records. The
//! store is append-only: `put_if_absent` is the only write, guaranteeing at
//! most one recorded computation per key even under concurrent writers.
//! [`MemoryTrialStore`] is process-local; [`FileTrialStore`] persists one
//! file per key under a cache directory, so memoized trials stay valid and
//! reusable across restarts.

use std::fs;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;

use dashmap::DashMap;

use crate::Result;

/// Cache key for a `(size, seed)` trial, e.g. `0010:0003`.
#[must_use]
pub fn trial_key(size: usize, seed: u64) -> String {
    format!("{size:04}:{seed:04}")
}

/// Persistent memoization interface for search trials.
pub trait TrialStore: Send + Sync {
    /// Get a memoized trial by key, `None` if the key is absent.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Insert a trial result only if the key is absent.
    ///
    /// Returns `true` when the value was inserted, `false` when an earlier
    /// result already occupies the key (that result is canonical).
    fn put_if_absent(&self, key: &str, value: Vec<u8>)
        -> impl Future<Output = Result<bool>> + Send;

    /// Check if a key exists.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;
}

/// In-memory trial store on a lock-free concurrent hashmap.
pub struct MemoryTrialStore {
    store: DashMap<String, Vec<u8>>,
}

impl MemoryTrialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Create with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            store: DashMap::with_capacity(capacity),
        }
    }

    /// Number of memoized trials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the store holds no trials.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for MemoryTrialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TrialStore for MemoryTrialStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.store.get(key).map(|v| v.value().clone()))
    }

    async fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool> {
        let mut inserted = false;
        self.store.entry(key.to_string()).or_insert_with(|| {
            inserted = true;
            value
        });
        Ok(inserted)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.store.contains_key(key))
    }
}

/// Trial store persisted as one file per key under a cache directory.
///
/// Survives process restarts: a driver pointed at the same directory
/// recalls every previously memoized trial instead of recomputing it.
/// Insert-if-absent rides on atomic create-new file semantics, so
/// concurrent writers (including separate processes sharing the
/// directory) record at most one value per key.
pub struct FileTrialStore {
    root: PathBuf,
}

impl FileTrialStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) when the directory cannot
    /// be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        // Keys are "{size:04}:{seed:04}"; ':' is not portable in filenames.
        self.root.join(format!("{}.json", key.replace(':', "_")))
    }
}

impl TrialStore for FileTrialStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.key_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool> {
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.key_path(key))
        {
            Ok(mut file) => {
                file.write_all(&value)?;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.key_path(key).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_key_format() {
        assert_eq!(trial_key(10, 3), "0010:0003");
        assert_eq!(trial_key(12345, 67890), "12345:67890");
    }

    #[tokio::test]
    async fn test_put_if_absent_first_writer_wins() {
        let store = MemoryTrialStore::new();

        assert!(store.put_if_absent("k", b"first".to_vec()).await.unwrap());
        assert!(!store.put_if_absent("k", b"second".to_vec()).await.unwrap());

        assert_eq!(store.get("k").await.unwrap(), Some(b"first".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let store = MemoryTrialStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
        assert!(!store.exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_writers_record_one_value_per_key() {
        use std::sync::Arc;

        let store = Arc::new(MemoryTrialStore::new());
        let mut handles = vec![];

        for i in 0..100u32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .put_if_absent("shared", i.to_le_bytes().to_vec())
                    .await
                    .unwrap()
            }));
        }

        let mut inserts = 0;
        for handle in handles {
            if handle.await.unwrap() {
                inserts += 1;
            }
        }

        assert_eq!(inserts, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_file_store_first_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTrialStore::new(dir.path()).unwrap();

        assert!(store.put_if_absent("0004:0001", b"first".to_vec()).await.unwrap());
        assert!(!store.put_if_absent("0004:0001", b"second".to_vec()).await.unwrap());

        assert_eq!(
            store.get("0004:0001").await.unwrap(),
            Some(b"first".to_vec())
        );
        assert!(store.exists("0004:0001").await.unwrap());
        assert!(!store.exists("0004:0002").await.unwrap());
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileTrialStore::new(dir.path()).unwrap();
            store
                .put_if_absent("0010:0003", b"persisted".to_vec())
                .await
                .unwrap();
        }

        let reopened = FileTrialStore::new(dir.path()).unwrap();
        assert_eq!(
            reopened.get("0010:0003").await.unwrap(),
            Some(b"persisted".to_vec())
        );
        assert!(!reopened
            .put_if_absent("0010:0003", b"clobber".to_vec())
            .await
            .unwrap());
    }
}
