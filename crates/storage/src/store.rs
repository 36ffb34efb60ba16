use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use quiz_core::model::{QuizId, SessionSnapshot};

/// Errors surfaced by the durable client store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Key-value contract for durable client storage.
///
/// Keys are plain strings; values are opaque serialized payloads. This is
/// the full surface the session controller needs, so tests can substitute
/// an in-memory fake for the real backend.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Fetch the value under `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the value under `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store for tests and prototyping. Clones share the same map.
#[derive(Clone, Default)]
pub struct InMemorySnapshotStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Typed layer over the raw store: JSON session snapshots under per-quiz keys.
#[derive(Clone)]
pub struct SnapshotRepository {
    store: Arc<dyn SnapshotStore>,
}

impl SnapshotRepository {
    #[must_use]
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemorySnapshotStore::new()))
    }

    /// Load the persisted snapshot for a quiz, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for an unreadable payload and
    /// `StorageError::Connection` for store failures.
    pub async fn load(&self, quiz_id: QuizId) -> Result<Option<SessionSnapshot>, StorageError> {
        let key = SessionSnapshot::storage_key(quiz_id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| StorageError::Serialization(err.to_string()))
    }

    /// Persist the snapshot for a quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if serialization or the write fails.
    pub async fn save(
        &self,
        quiz_id: QuizId,
        snapshot: &SessionSnapshot,
    ) -> Result<(), StorageError> {
        let key = SessionSnapshot::storage_key(quiz_id);
        let raw = serde_json::to_string(snapshot)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.store.set(&key, &raw).await
    }

    /// Remove the snapshot for a quiz, if present.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    pub async fn clear(&self, quiz_id: QuizId) -> Result<(), StorageError> {
        let key = SessionSnapshot::storage_key(quiz_id);
        self.store.remove(&key).await
    }
}
