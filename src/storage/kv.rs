//! Key-value storage seam.
//!
//! Persistence is consumed as opaque JSON records under string keys, so
//! hosts can back it with whatever single-user store they have. Reads
//! never error, a missing or corrupt record is simply absent.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::error::{PlannerError, Result};

/// Get/set/delete of opaque JSON records.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a record. `None` covers both "missing" and "corrupt".
    async fn get(&self, key: &str) -> Option<Value>;

    async fn set(&self, key: &str, value: &Value) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// File-backed store: one JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Option<Value> {
        let path = self.path_for(key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(target: "trip_planner::storage", key, error = %err, "read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(target: "trip_planner::storage", key, error = %err, "corrupt record ignored");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| PlannerError::Storage(format!("create dir failed: {err}")))?;

        let raw = serde_json::to_string(value)?;
        tokio::fs::write(self.path_for(key), raw)
            .await
            .map_err(|err| PlannerError::Storage(format!("write `{key}` failed: {err}")))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PlannerError::Storage(format!(
                "delete `{key}` failed: {err}"
            ))),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .lock()
            .expect("kv store poisoned")
            .get(key)
            .cloned()
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        self.entries
            .lock()
            .expect("kv store poisoned")
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .expect("kv store poisoned")
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn file_store_round_trips_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store
            .set("saved_trip_plans", &json!([{"id": "plan_1"}]))
            .await
            .unwrap();
        let value = store.get("saved_trip_plans").await.unwrap();
        assert_eq!(value[0]["id"], "plan_1");

        store.delete("saved_trip_plans").await.unwrap();
        assert!(store.get("saved_trip_plans").await.is_none());
    }

    #[tokio::test]
    async fn file_store_treats_corrupt_data_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        tokio::fs::write(dir.path().join("broken.json"), "{not json")
            .await
            .unwrap();
        assert!(store.get("broken").await.is_none());
    }

    #[tokio::test]
    async fn deleting_a_missing_key_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.delete("nothing_here").await.unwrap();
    }
}
