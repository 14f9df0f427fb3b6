//! Blob sink for downloaded payloads
//!
//! Streaming writer/reader keyed by task, on top of the object_store
//! crate. `download.mode = local` maps to a filesystem prefix; tests use
//! the in-memory backend.

use object_store::buffered::{BufReader, BufWriter};
use object_store::path::Path as BlobPath;
use object_store::ObjectStore;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{DownloadConfig, DownloadMode};

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BlobError>;

/// Canonical blob key for a task's payload.
pub fn task_blob_key(task_id: i64) -> String {
    format!("download_file_{}", task_id)
}

/// Blob store wrapping an object_store backend
#[derive(Clone)]
pub struct BlobStore {
    store: Arc<dyn ObjectStore>,
}

impl BlobStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Local filesystem backend rooted at the download directory, which is
    /// created if absent.
    pub fn local(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let store = object_store::local::LocalFileSystem::new_with_prefix(root)?;
        Ok(Self {
            store: Arc::new(store),
        })
    }

    /// In-memory backend for testing/development
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(object_store::memory::InMemory::new()),
        }
    }

    pub fn from_config(cfg: &DownloadConfig) -> Result<Self> {
        match cfg.mode {
            DownloadMode::Local => Self::local(&cfg.download_directory),
        }
    }

    /// Streaming writer for a key. A finished write replaces any previous
    /// object under the same key; the caller must shut the writer down to
    /// complete the put.
    pub fn writer(&self, key: &str) -> BufWriter {
        BufWriter::new(self.store.clone(), BlobPath::from(key))
    }

    /// Buffered streaming reader for a key.
    pub async fn reader(&self, key: &str) -> Result<BufReader> {
        let path = BlobPath::from(key);
        let meta = match self.store.head(&path).await {
            Ok(meta) => meta,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(BlobError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(BufReader::new(self.store.clone(), &meta))
    }

    /// Read a whole object; small payloads and tests.
    pub async fn read_all(&self, key: &str) -> Result<Vec<u8>> {
        let path = BlobPath::from(key);
        let result = match self.store.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(BlobError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(result.bytes().await?.to_vec())
    }
}
