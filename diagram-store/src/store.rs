//! The document-store collaborator boundary and reference backends.
//!
//! The remote store is external to the engine: anything that can load
//! and save a named document as a content string. Backends are expected
//! to be fallible and may signal "not found" either with `Ok(None)` or
//! with an error; the coordinator tolerates both.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by the persistence layer itself.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Every configured save channel failed.
    #[error("All save channels failed for document {0}")]
    SaveFailed(String),
    /// An I/O error occurred in a filesystem backend.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A named-document persistence backend.
///
/// Backend error types are opaque to the engine, so both operations
/// return `anyhow` errors.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load a document's content string, `None` if it does not exist.
    async fn load(&self, document_id: &str) -> anyhow::Result<Option<String>>;

    /// Save a document's content string.
    async fn save(&self, document_id: &str, content: &str) -> anyhow::Result<()>;
}

/// In-memory store, primarily for tests and as a fallback channel.
///
/// Counts saves so tests can assert that redundant writes were skipped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<HashMap<String, String>>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with one document.
    #[must_use]
    pub fn with_document(document_id: impl Into<String>, content: impl Into<String>) -> Self {
        let store = Self::new();
        store
            .documents
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(document_id.into(), content.into());
        store
    }

    /// Number of save calls that reached this store.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }

    /// Current content of a document, if any.
    #[must_use]
    pub fn content(&self, document_id: &str) -> Option<String> {
        self.documents
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(document_id)
            .cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self, document_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self.content(document_id))
    }

    async fn save(&self, document_id: &str, content: &str) -> anyhow::Result<()> {
        self.saves.fetch_add(1, Ordering::Relaxed);
        self.documents
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(document_id.to_string(), content.to_string());
        Ok(())
    }
}

/// Filesystem store: one JSON file per document under a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `data_dir`, creating the directory if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    fn path(&self, document_id: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.json", sanitize_filename(document_id)))
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn load(&self, document_id: &str) -> anyhow::Result<Option<String>> {
        match tokio::fs::read_to_string(self.path(document_id)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, document_id: &str, content: &str) -> anyhow::Result<()> {
        tokio::fs::write(self.path(document_id), content).await?;
        Ok(())
    }
}

/// Sanitize a document ID for use as a filename.
///
/// Replaces any character that is not alphanumeric, `-`, or `_` with `_`.
fn sanitize_filename(document_id: &str) -> String {
    document_id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
