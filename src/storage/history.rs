//! Recent search/plan history, capped and newest first.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::storage::kv::KvStore;

const HISTORY_KEY: &str = "trip_app_history";
const MAX_HISTORY: usize = 20;

/// One history entry, e.g. a searched activity or a generated plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    /// Entry category, e.g. "activity" or "plan"
    pub kind: String,
    pub label: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone)]
pub struct HistoryStore {
    kv: Arc<dyn KvStore>,
}

impl HistoryStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub async fn list(&self) -> Vec<HistoryEntry> {
        let Some(value) = self.kv.get(HISTORY_KEY).await else {
            return Vec::new();
        };
        match serde_json::from_value(value) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(target: "trip_planner::storage", error = %err, "history unreadable, starting empty");
                Vec::new()
            }
        }
    }

    /// Prepend an entry, keeping only the most recent `MAX_HISTORY`.
    pub async fn record(&self, kind: &str, label: &str) -> Result<HistoryEntry> {
        let entry = HistoryEntry {
            id: format!("{kind}_{}", Uuid::new_v4()),
            kind: kind.to_string(),
            label: label.to_string(),
            timestamp: Utc::now(),
        };

        let mut entries = self.list().await;
        entries.insert(0, entry.clone());
        entries.truncate(MAX_HISTORY);

        self.kv
            .set(HISTORY_KEY, &serde_json::to_value(&entries)?)
            .await?;
        Ok(entry)
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        let mut entries = self.list().await;
        entries.retain(|entry| entry.id != id);
        self.kv
            .set(HISTORY_KEY, &serde_json::to_value(&entries)?)
            .await
    }

    pub async fn clear(&self) -> Result<()> {
        self.kv.delete(HISTORY_KEY).await
    }
}
