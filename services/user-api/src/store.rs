// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Persistence for rate windows.
//!
//! Each identifier's history is a JSON array of unix timestamps stored under
//! a key derived from a BLAKE3 hash of the identifier, so raw client
//! addresses never reach the backend.

use async_trait::async_trait;
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::trace;

const KEY_PREFIX: &str = "rate_limit_";

/// Storage failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt rate window for {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Key/value backend for rate windows.
///
/// `load` returns an empty history for unknown keys.
#[async_trait]
pub trait WindowStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Vec<u64>, StoreError>;

    async fn save(&self, key: &str, timestamps: &[u64]) -> Result<(), StoreError>;
}

/// Derive the storage key for an identifier.
pub fn storage_key(identifier: &str) -> String {
    format!("{}{}", KEY_PREFIX, blake3::hash(identifier.as_bytes()).to_hex())
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    windows: DashMap<String, Vec<u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[async_trait]
impl WindowStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Vec<u64>, StoreError> {
        Ok(self
            .windows
            .get(key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn save(&self, key: &str, timestamps: &[u64]) -> Result<(), StoreError> {
        self.windows.insert(key.to_string(), timestamps.to_vec());
        Ok(())
    }
}

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create the store, creating `dir` if it does not exist.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Io {
                key: dir.display().to_string(),
                source,
            })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl WindowStore for FileStore {
    async fn load(&self, key: &str) -> Result<Vec<u64>, StoreError> {
        let path = self.path_for(key);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    key: key.to_string(),
                    source,
                })
            }
        };

        serde_json::from_slice(&data).map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })
    }

    async fn save(&self, key: &str, timestamps: &[u64]) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };

        let body = serde_json::to_vec(timestamps).map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })?;

        // Rename keeps readers from ever seeing a half-written array.
        tokio::fs::write(&tmp, body).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_err)?;

        trace!(key, entries = timestamps.len(), "Rate window persisted");
        Ok(())
    }
}
