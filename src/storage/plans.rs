//! Saved-plan persistence on top of the key-value seam.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::storage::kv::KvStore;
use crate::types::Plan;
use crate::wizard::WizardParams;

const PLANS_KEY: &str = "saved_trip_plans";

/// A persisted plan with the wizard inputs that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPlanRecord {
    pub id: String,
    pub saved_at: DateTime<Utc>,
    pub plan: Plan,
    pub params: WizardParams,
}

/// Store of saved plans under a single storage key.
///
/// Writes are read-modify-write with last-writer-wins, which is fine for a
/// single local user.
#[derive(Clone)]
pub struct PlanStore {
    kv: Arc<dyn KvStore>,
}

impl PlanStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Save a plan under a fresh id.
    pub async fn save(&self, plan: &Plan, params: &WizardParams) -> Result<SavedPlanRecord> {
        self.save_as(None, plan, params).await
    }

    /// Save a plan, replacing any record with the same id. Newest record
    /// first.
    pub async fn save_as(
        &self,
        id: Option<String>,
        plan: &Plan,
        params: &WizardParams,
    ) -> Result<SavedPlanRecord> {
        let record = SavedPlanRecord {
            id: id.unwrap_or_else(|| format!("plan_{}", Uuid::new_v4())),
            saved_at: Utc::now(),
            plan: plan.clone(),
            params: params.clone(),
        };

        let mut records = self.list().await;
        records.retain(|existing| existing.id != record.id);
        records.insert(0, record.clone());

        self.kv
            .set(PLANS_KEY, &serde_json::to_value(&records)?)
            .await?;
        Ok(record)
    }

    /// All saved plans, most recent save first. Empty on missing or
    /// corrupt storage.
    pub async fn list(&self) -> Vec<SavedPlanRecord> {
        let Some(value) = self.kv.get(PLANS_KEY).await else {
            return Vec::new();
        };

        match serde_json::from_value(value) {
            Ok(records) => records,
            Err(err) => {
                warn!(target: "trip_planner::storage", error = %err, "saved plans unreadable, starting empty");
                Vec::new()
            }
        }
    }

    pub async fn get(&self, id: &str) -> Option<SavedPlanRecord> {
        self.list().await.into_iter().find(|record| record.id == id)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut records = self.list().await;
        records.retain(|record| record.id != id);
        self.kv
            .set(PLANS_KEY, &serde_json::to_value(&records)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::kv::MemoryStore;
    use crate::types::Budget;

    fn sample_plan() -> Plan {
        Plan {
            summary: "富良野で2泊3日のスキー旅行".to_string(),
            itinerary: vec![],
            hotels: vec![],
            budget_breakdown: Budget {
                transportation: 10000,
                accommodation: 30000,
                activities: 20000,
                meals: 15000,
                other: 5000,
                total: 80000,
            },
            tips: vec![],
            packing_list: vec![],
            generated_at: None,
            params: None,
        }
    }

    fn sample_params() -> WizardParams {
        WizardParams {
            activity: "スキー".to_string(),
            ..WizardParams::default()
        }
    }

    #[tokio::test]
    async fn save_assigns_an_id_and_lists_newest_first() {
        let store = PlanStore::new(Arc::new(MemoryStore::new()));

        let first = store.save(&sample_plan(), &sample_params()).await.unwrap();
        let second = store.save(&sample_plan(), &sample_params()).await.unwrap();

        assert!(first.id.starts_with("plan_"));
        assert_ne!(first.id, second.id);

        let records = store.list().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, second.id);
    }

    #[tokio::test]
    async fn saving_an_existing_id_replaces_the_record() {
        let store = PlanStore::new(Arc::new(MemoryStore::new()));

        let original = store.save(&sample_plan(), &sample_params()).await.unwrap();
        let mut updated_plan = sample_plan();
        updated_plan.summary = "更新されたプラン".to_string();

        store
            .save_as(Some(original.id.clone()), &updated_plan, &sample_params())
            .await
            .unwrap();

        let records = store.list().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].plan.summary, "更新されたプラン");
    }

    #[tokio::test]
    async fn delete_removes_only_the_target() {
        let store = PlanStore::new(Arc::new(MemoryStore::new()));

        let keep = store.save(&sample_plan(), &sample_params()).await.unwrap();
        let drop = store.save(&sample_plan(), &sample_params()).await.unwrap();

        store.delete(&drop.id).await.unwrap();

        let records = store.list().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, keep.id);
        assert!(store.get(&drop.id).await.is_none());
    }

    #[tokio::test]
    async fn list_is_empty_on_missing_storage() {
        let store = PlanStore::new(Arc::new(MemoryStore::new()));
        assert!(store.list().await.is_empty());
    }
}
