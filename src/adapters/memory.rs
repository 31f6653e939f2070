use crate::domain::inspection::{InspectionBatch, InspectionResult};
use crate::domain::mint::Mint;
use crate::domain::ports::{
    BatchStore, MintStore, ModelVariation, ModelVariationLookup, PassedProductLister, ProductSync,
    RequestedFlagStore,
};
use crate::utils::error::{Result, TraceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::Mutex;

/// Everything the memory store holds, in the shape written to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub batches: BTreeMap<String, InspectionBatch>,
    /// modelID -> modelNumber
    #[serde(default)]
    pub models: BTreeMap<String, String>,
    /// productID -> last synced inspection result
    #[serde(default)]
    pub products: BTreeMap<String, Option<InspectionResult>>,
    #[serde(default)]
    pub mints: Vec<Mint>,
}

/// In-process store behind every port. Each call takes the lock once, so
/// every read-modify-write on a single document is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }

    pub async fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            tracing::info!(path = %path.display(), "no snapshot yet, starting empty");
            return Ok(Self::new());
        }
        let data = tokio::fs::read(path).await?;
        let mut snapshot: Snapshot = serde_json::from_slice(&data)?;
        for batch in snapshot.batches.values_mut() {
            batch.validate()?;
            let stored_total = batch.total_passed;
            batch.recompute_total_passed();
            if batch.total_passed != stored_total {
                tracing::warn!(
                    production_id = %batch.production_id,
                    stored_total,
                    total_passed = batch.total_passed,
                    "snapshot carried a stale passed count"
                );
            }
        }
        Ok(Self::from_snapshot(snapshot))
    }

    pub async fn save_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec_pretty(&*self.state.lock().await)?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.clone()
    }

    /// Seeds a batch and a product record for each of its units.
    pub async fn insert_batch(&self, batch: InspectionBatch) {
        let mut state = self.state.lock().await;
        for item in &batch.inspections {
            state
                .products
                .entry(item.product_id.clone())
                .or_insert(item.inspection_result);
        }
        state.batches.insert(batch.production_id.clone(), batch);
    }

    pub async fn insert_model(&self, model_id: &str, model_number: &str) {
        self.state
            .lock()
            .await
            .models
            .insert(model_id.to_string(), model_number.to_string());
    }

    pub async fn product_result(&self, product_id: &str) -> Option<InspectionResult> {
        self.state
            .lock()
            .await
            .products
            .get(product_id)
            .copied()
            .flatten()
    }

    pub async fn mints(&self) -> Vec<Mint> {
        self.state.lock().await.mints.clone()
    }
}

#[async_trait]
impl BatchStore for MemoryStore {
    async fn get_by_production_id(&self, production_id: &str) -> Result<Option<InspectionBatch>> {
        Ok(self.state.lock().await.batches.get(production_id).cloned())
    }

    async fn save(&self, mut batch: InspectionBatch) -> Result<InspectionBatch> {
        let mut state = self.state.lock().await;
        let found = state
            .batches
            .get(&batch.production_id)
            .map(|b| b.version)
            .unwrap_or(0);
        if found != batch.version {
            return Err(TraceError::VersionConflict {
                production_id: batch.production_id,
                expected: batch.version,
                found,
            });
        }

        batch.version += 1;
        state
            .batches
            .insert(batch.production_id.clone(), batch.clone());
        Ok(batch)
    }
}

#[async_trait]
impl ModelVariationLookup for MemoryStore {
    async fn get_by_model_id(&self, model_id: &str) -> Result<ModelVariation> {
        self.state
            .lock()
            .await
            .models
            .get(model_id)
            .map(|n| ModelVariation {
                model_number: n.clone(),
            })
            .ok_or_else(|| TraceError::Store {
                message: format!("model {model_id} not found"),
            })
    }
}

#[async_trait]
impl ProductSync for MemoryStore {
    async fn update_inspection_result(
        &self,
        product_id: &str,
        result: InspectionResult,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.products.get_mut(product_id) {
            Some(slot) => {
                *slot = Some(result);
                Ok(())
            }
            None => Err(TraceError::Store {
                message: format!("product {product_id} not found"),
            }),
        }
    }
}

#[async_trait]
impl PassedProductLister for MemoryStore {
    async fn list_passed_product_ids(&self, production_id: &str) -> Result<Option<Vec<String>>> {
        Ok(self
            .state
            .lock()
            .await
            .batches
            .get(production_id)
            .map(InspectionBatch::passed_product_ids))
    }
}

#[async_trait]
impl RequestedFlagStore for MemoryStore {
    /// Check-then-set under one lock: claiming an already claimed batch
    /// fails instead of silently succeeding.
    async fn set_requested(&self, production_id: &str, requested: bool) -> Result<InspectionBatch> {
        let mut state = self.state.lock().await;
        let batch = state
            .batches
            .get_mut(production_id)
            .ok_or_else(|| TraceError::BatchNotFound {
                production_id: production_id.to_string(),
            })?;
        if requested && batch.requested {
            return Err(TraceError::AlreadyRequested {
                production_id: production_id.to_string(),
            });
        }
        batch.requested = requested;
        batch.version += 1;
        Ok(batch.clone())
    }
}

#[async_trait]
impl MintStore for MemoryStore {
    async fn create(&self, mut mint: Mint) -> Result<Mint> {
        mint.validate()?;
        if mint.id().is_empty() {
            mint.assign_id(uuid::Uuid::now_v7().to_string());
        }
        let mut state = self.state.lock().await;
        if state.mints.iter().any(|m| m.id() == mint.id()) {
            return Err(TraceError::Store {
                message: format!("mint {} already exists", mint.id()),
            });
        }
        state.mints.push(mint.clone());
        Ok(mint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::inspection::InspectionItem;
    use crate::domain::mint::NewMint;
    use chrono::Utc;
    use tempfile::TempDir;

    fn batch() -> InspectionBatch {
        InspectionBatch::new(
            "P1",
            vec![
                InspectionItem::new("a", "M1").with_result(InspectionResult::Passed),
                InspectionItem::new("b", "M1"),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn save_bumps_version_and_rejects_stale_writes() {
        let store = MemoryStore::new();
        store.insert_batch(batch()).await;

        let first = store.get_by_production_id("P1").await.unwrap().unwrap();
        let second = first.clone();

        let saved = store.save(first).await.unwrap();
        assert_eq!(saved.version, 1);

        let err = store.save(second).await.unwrap_err();
        assert!(matches!(
            err,
            TraceError::VersionConflict {
                expected: 0,
                found: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn requested_flag_can_only_be_claimed_once() {
        let store = MemoryStore::new();
        store.insert_batch(batch()).await;

        let flagged = store.set_requested("P1", true).await.unwrap();
        assert!(flagged.requested);
        assert!(matches!(
            store.set_requested("P1", true).await,
            Err(TraceError::AlreadyRequested { .. })
        ));
        assert!(matches!(
            store.set_requested("P9", true).await,
            Err(TraceError::BatchNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn lists_passed_units_or_none_for_unknown_production() {
        let store = MemoryStore::new();
        store.insert_batch(batch()).await;

        assert_eq!(
            store.list_passed_product_ids("P1").await.unwrap(),
            Some(vec!["a".to_string()])
        );
        assert_eq!(store.list_passed_product_ids("P2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn product_sync_never_creates_products() {
        let store = MemoryStore::new();
        store.insert_batch(batch()).await;

        store
            .update_inspection_result("b", InspectionResult::Failed)
            .await
            .unwrap();
        assert_eq!(store.product_result("b").await, Some(InspectionResult::Failed));
        assert!(store
            .update_inspection_result("zzz", InspectionResult::Passed)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn snapshot_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("trace.json");

        let store = MemoryStore::new();
        store.insert_batch(batch()).await;
        store.insert_model("M1", "MN-1").await;
        let mint = Mint::new(NewMint {
            inspection_id: "P1".into(),
            brand_id: "b".into(),
            token_blueprint_id: "t".into(),
            products: vec!["a".into()],
            created_by: "x".into(),
            created_at: Some(Utc::now()),
            scheduled_burn_date: None,
        })
        .unwrap();
        let created = store.create(mint).await.unwrap();
        assert!(!created.id().is_empty());

        store.save_file(&path).await.unwrap();
        let reloaded = MemoryStore::load_file(&path).await.unwrap();

        assert_eq!(reloaded.snapshot().await, store.snapshot().await);
    }

    #[tokio::test]
    async fn loading_recounts_passed_units() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trace.json");
        let json = r#"{
            "batches": {
                "P1": {
                    "productionID": "P1",
                    "inspections": [
                        {"productID": "a", "modelID": "M1", "inspectionResult": "passed"},
                        {"productID": "b", "modelID": "M1", "inspectionResult": "failed"}
                    ],
                    "status": "pending",
                    "totalPassed": 7
                }
            }
        }"#;
        tokio::fs::write(&path, json).await.unwrap();

        let store = MemoryStore::load_file(&path).await.unwrap();
        let loaded = store.get_by_production_id("P1").await.unwrap().unwrap();
        assert_eq!(loaded.total_passed, 1);
    }

    #[tokio::test]
    async fn loading_rejects_duplicate_or_blank_product_ids() {
        let dir = TempDir::new().unwrap();
        for items in [
            r#"[{"productID": "a", "modelID": "M1"}, {"productID": "a", "modelID": "M1"}]"#,
            r#"[{"productID": "  ", "modelID": "M1"}]"#,
        ] {
            let path = dir.path().join("trace.json");
            let json = format!(
                r#"{{"batches": {{"P1": {{"productionID": "P1", "inspections": {items}}}}}}}"#
            );
            tokio::fs::write(&path, json).await.unwrap();

            assert!(matches!(
                MemoryStore::load_file(&path).await,
                Err(TraceError::InvalidProductIDs { .. })
            ));
        }
    }

    #[tokio::test]
    async fn missing_snapshot_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::load_file(dir.path().join("absent.json"))
            .await
            .unwrap();
        assert_eq!(store.snapshot().await, Snapshot::default());
    }
}
