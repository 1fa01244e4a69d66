use async_trait::async_trait;
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

use crate::error::StorageError;

// 1. KeyValueStore Contract
/// KeyValueStore
///
/// Small string key/value contract backing the persisted "last path before lock".
/// The trait lets the file-backed store used in deployments be swapped for the
/// in-memory store in tests without touching the lock gate.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrites any previous value under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// StorageState
///
/// The shared handle stored in `AppState`.
pub type StorageState = Arc<dyn KeyValueStore>;

// 2. The Real Implementation (JSON file)
/// FileKeyValueStore
///
/// Keeps every key in one JSON object on disk. The file is read once on open and
/// rewritten whole on each `set`; the in-memory copy is authoritative in between.
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileKeyValueStore {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => HashMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value.to_string());

        let bytes = serde_json::to_vec_pretty(&*entries)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

// 3. The Mock Implementation
/// MemoryKeyValueStore
///
/// In-memory store for tests and for runs without `LOCK_STORE_PATH`.
/// `new_failing` makes every call fail, to exercise error paths.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.should_fail {
            return Err(StorageError::Unavailable("simulated failure".to_string()));
        }
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.should_fail {
            return Err(StorageError::Unavailable("simulated failure".to_string()));
        }
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
