//! Favorite destinations, kept under their own storage key.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::storage::kv::KvStore;
use crate::types::Destination;

const FAVORITES_KEY: &str = "trip_app_favorites";

/// A favorited destination with the time it was added.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    #[serde(flatten)]
    pub destination: Destination,
    pub added_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct FavoritesStore {
    kv: Arc<dyn KvStore>,
}

impl FavoritesStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub async fn list(&self) -> Vec<FavoriteEntry> {
        let Some(value) = self.kv.get(FAVORITES_KEY).await else {
            return Vec::new();
        };
        match serde_json::from_value(value) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(target: "trip_planner::storage", error = %err, "favorites unreadable, starting empty");
                Vec::new()
            }
        }
    }

    pub async fn is_favorite(&self, id: &str) -> bool {
        self.list()
            .await
            .iter()
            .any(|entry| entry.destination.id == id)
    }

    /// Add a destination. Returns false when it was already present.
    pub async fn add(&self, destination: &Destination) -> Result<bool> {
        let mut entries = self.list().await;
        if entries
            .iter()
            .any(|entry| entry.destination.id == destination.id)
        {
            return Ok(false);
        }

        entries.push(FavoriteEntry {
            destination: destination.clone(),
            added_at: Utc::now(),
        });
        self.kv
            .set(FAVORITES_KEY, &serde_json::to_value(&entries)?)
            .await?;
        Ok(true)
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        let mut entries = self.list().await;
        entries.retain(|entry| entry.destination.id != id);
        self.kv
            .set(FAVORITES_KEY, &serde_json::to_value(&entries)?)
            .await
    }

    /// Flip favorite status; returns whether the destination is now a
    /// favorite.
    pub async fn toggle(&self, destination: &Destination) -> Result<bool> {
        if self.is_favorite(&destination.id).await {
            self.remove(&destination.id).await?;
            Ok(false)
        } else {
            self.add(destination).await?;
            Ok(true)
        }
    }
}
