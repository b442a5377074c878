//! Flat-file JSON document store.
//!
//! Each document lives in `<data_dir>/<key>.json` and is always read and
//! written whole. Writes go to a temporary file in the same directory which
//! is then renamed over the target, so a crash never leaves a truncated
//! document behind.
//!
//! Loading a missing document yields `T::default()`. Loading a document that
//! is not well-formed JSON for `T` is an error for every store; callers
//! report it instead of treating the document as empty, and `update` never
//! overwrites it.

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors raised by the document store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read document '{key}': {source}")]
    Read { key: String, source: io::Error },
    #[error("document '{key}' is not well-formed: {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },
    #[error("failed to encode document '{key}': {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
    #[error("failed to write document '{key}': {source}")]
    Write { key: String, source: io::Error },
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Whole-document JSON store rooted at a data directory
#[derive(Debug)]
pub struct DocumentStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DocumentStore {
    /// Open a store rooted at `root`. The directory is created lazily on the first write.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Load a document, returning `T::default()` when it does not exist yet.
    pub fn load<T>(&self, key: &str) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Default,
    {
        read_document(&self.path_for(key), key)
    }

    /// Overwrite a document atomically.
    pub fn save<T>(&self, key: &str, document: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        let body = encode_document(key, document)?;
        write_document(&self.root, &self.path_for(key), key, &body)
    }

    /// Read-modify-write a document under its per-document lock.
    ///
    /// The document is saved only when `mutate` succeeds; a failing closure
    /// or a malformed document leaves the file untouched. File I/O runs on
    /// the blocking pool while the lock is held.
    pub async fn update<T, R, E, F>(&self, key: &str, mutate: F) -> Result<R, E>
    where
        T: Serialize + DeserializeOwned + Default + Send + 'static,
        E: From<StoreError>,
        F: FnOnce(&mut T) -> Result<R, E>,
    {
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;

        let path = self.path_for(key);
        let owned_key = key.to_string();
        let mut document: T = run_blocking(move || read_document(&path, &owned_key)).await?;

        let outcome = mutate(&mut document)?;

        let body = encode_document(key, &document)?;
        self.write_blocking(key, body).await?;
        Ok(outcome)
    }

    /// Overwrite a document under its per-document lock, whatever it held before.
    pub async fn replace<T>(&self, key: &str, document: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        let body = encode_document(key, document)?;

        let lock = self.lock_for(key);
        let _guard = lock.lock().await;
        self.write_blocking(key, body).await
    }

    async fn write_blocking(&self, key: &str, body: String) -> Result<(), StoreError> {
        let root = self.root.clone();
        let path = self.path_for(key);
        let key = key.to_string();
        run_blocking(move || write_document(&root, &path, &key, &body)).await
    }

    fn lock_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(key.to_string()).or_default())
    }
}

async fn run_blocking<R, F>(task: F) -> Result<R, StoreError>
where
    R: Send + 'static,
    F: FnOnce() -> Result<R, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(task).await?
}

fn read_document<T>(path: &Path, key: &str) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
        Err(source) => {
            return Err(StoreError::Read {
                key: key.to_string(),
                source,
            })
        }
    };

    serde_json::from_str(&raw).map_err(|source| {
        warn!("Document {} is malformed: {}", path.display(), source);
        StoreError::Decode {
            key: key.to_string(),
            source,
        }
    })
}

fn encode_document<T>(key: &str, document: &T) -> Result<String, StoreError>
where
    T: Serialize + ?Sized,
{
    let mut body = serde_json::to_string_pretty(document).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })?;
    body.push('\n');
    Ok(body)
}

/// Write `body` to a temporary file next to `path`, then rename it over `path`
fn write_document(root: &Path, path: &Path, key: &str, body: &str) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        key: key.to_string(),
        source,
    };

    fs::create_dir_all(root).map_err(write_err)?;
    let mut temp = NamedTempFile::new_in(root).map_err(write_err)?;
    temp.write_all(body.as_bytes()).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;

    info!("Saved document {} ({} bytes)", key, body.len());
    Ok(())
}
