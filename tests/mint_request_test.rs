use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::{Arc, Mutex};
use trace_mint::core::{
    BatchStore, CompanyScope, InspectionBatch, InspectionItem, InspectionResult,
    RequestedFlagStore,
};
use trace_mint::{MemoryStore, MintRequestInput, MintRequestService, TraceError};

struct BrokenFlags;

#[async_trait]
impl RequestedFlagStore for BrokenFlags {
    async fn set_requested(
        &self,
        production_id: &str,
        _requested: bool,
    ) -> trace_mint::Result<InspectionBatch> {
        Err(TraceError::Store {
            message: format!("flag write for {production_id} timed out"),
        })
    }
}

/// Serves the first batch it ever read for every later read, like a
/// replica that lags behind a concurrent request's flag write.
struct StaleReads {
    inner: Arc<MemoryStore>,
    first: Mutex<Option<InspectionBatch>>,
}

#[async_trait]
impl BatchStore for StaleReads {
    async fn get_by_production_id(
        &self,
        production_id: &str,
    ) -> trace_mint::Result<Option<InspectionBatch>> {
        let cached = self.first.lock().unwrap().clone();
        if let Some(batch) = cached {
            return Ok(Some(batch));
        }
        let batch = self.inner.get_by_production_id(production_id).await?;
        *self.first.lock().unwrap() = batch.clone();
        Ok(batch)
    }

    async fn save(&self, batch: InspectionBatch) -> trace_mint::Result<InspectionBatch> {
        self.inner.save(batch).await
    }
}

fn passed(product_id: &str) -> InspectionItem {
    InspectionItem::new(product_id, "M1").with_result(InspectionResult::Passed)
}

fn failed(product_id: &str) -> InspectionItem {
    InspectionItem::new(product_id, "M1").with_result(InspectionResult::Failed)
}

async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_batch(
            InspectionBatch::new("P1", vec![passed("u1"), failed("u2"), passed("u3")]).unwrap(),
        )
        .await;
    store
        .insert_batch(InspectionBatch::new("P2", vec![passed("v1")]).unwrap())
        .await;
    store
        .insert_batch(InspectionBatch::new("P3", vec![failed("w1")]).unwrap())
        .await;
    store
}

fn input(production_id: &str) -> MintRequestInput {
    MintRequestInput {
        production_id: production_id.to_string(),
        brand_id: "brand-1".to_string(),
        token_blueprint_id: "tb-1".to_string(),
        created_by: "member-7".to_string(),
        created_at: Some(Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()),
        scheduled_burn_date: None,
    }
}

fn service(
    store: &Arc<MemoryStore>,
) -> MintRequestService<MemoryStore, MemoryStore, MemoryStore, MemoryStore> {
    MintRequestService::new(store.clone(), store.clone(), store.clone(), store.clone())
}

#[tokio::test]
async fn request_mint_claims_passed_units_and_flags_the_batch() {
    let store = seeded_store().await;
    let scope = CompanyScope::new("company-1", ["P1", "P2"]).unwrap();

    let outcome = service(&store).request_mint(&scope, input("P1")).await.unwrap();

    assert!(outcome.requested_flag_set);
    assert!(!outcome.mint.id().is_empty());
    assert_eq!(outcome.mint.inspection_id(), "P1");
    assert_eq!(outcome.mint.products(), ["u1", "u3"]);
    assert!(!outcome.mint.is_minted());

    let batch = store.get_by_production_id("P1").await.unwrap().unwrap();
    assert!(batch.requested);
    let other = store.get_by_production_id("P2").await.unwrap().unwrap();
    assert!(!other.requested);
    assert_eq!(store.mints().await.len(), 1);
}

#[tokio::test]
async fn second_request_for_the_same_production_is_rejected() {
    let store = seeded_store().await;
    let scope = CompanyScope::new("company-1", ["P1"]).unwrap();
    let service = service(&store);

    service.request_mint(&scope, input("P1")).await.unwrap();
    let err = service.request_mint(&scope, input("P1")).await.unwrap_err();

    assert!(matches!(err, TraceError::AlreadyRequested { .. }));
    assert_eq!(store.mints().await.len(), 1);
}

#[tokio::test]
async fn productions_outside_the_company_scope_are_refused() {
    let store = seeded_store().await;
    let scope = CompanyScope::new("company-1", ["P2"]).unwrap();

    let err = service(&store)
        .request_mint(&scope, input("P1"))
        .await
        .unwrap_err();

    assert!(matches!(err, TraceError::OutOfScope { .. }));
    assert!(store.mints().await.is_empty());
}

#[tokio::test]
async fn production_without_passed_units_cannot_be_minted() {
    let store = seeded_store().await;
    let scope = CompanyScope::new("company-1", ["P3"]).unwrap();

    let err = service(&store)
        .request_mint(&scope, input("P3"))
        .await
        .unwrap_err();

    assert!(matches!(err, TraceError::InvalidProducts));
    let batch = store.get_by_production_id("P3").await.unwrap().unwrap();
    assert!(!batch.requested);
}

#[tokio::test]
async fn missing_batch_is_not_found() {
    let store = seeded_store().await;
    let scope = CompanyScope::new("company-1", ["P9"]).unwrap();

    let err = service(&store)
        .request_mint(&scope, input("P9"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn invalid_mint_fields_store_nothing() {
    let store = seeded_store().await;
    let scope = CompanyScope::new("company-1", ["P1"]).unwrap();

    let err = service(&store)
        .request_mint(
            &scope,
            MintRequestInput {
                brand_id: "  ".to_string(),
                ..input("P1")
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TraceError::InvalidBrandID));
    assert!(store.mints().await.is_empty());
    let batch = store.get_by_production_id("P1").await.unwrap().unwrap();
    assert!(!batch.requested);
}

#[tokio::test]
async fn flag_failure_keeps_the_mint_authoritative() {
    let store = seeded_store().await;
    let scope = CompanyScope::new("company-1", ["P1"]).unwrap();
    let service = MintRequestService::new(
        store.clone(),
        store.clone(),
        Arc::new(BrokenFlags),
        store.clone(),
    );

    let outcome = service.request_mint(&scope, input("P1")).await.unwrap();

    assert!(!outcome.requested_flag_set);
    assert_eq!(store.mints().await, vec![outcome.mint]);
    let batch = store.get_by_production_id("P1").await.unwrap().unwrap();
    assert!(!batch.requested);
}

#[tokio::test]
async fn racing_request_reports_the_duplicate_mint() {
    let store = seeded_store().await;
    let scope = CompanyScope::new("company-1", ["P1"]).unwrap();
    let stale = Arc::new(StaleReads {
        inner: store.clone(),
        first: Mutex::new(None),
    });
    let service = MintRequestService::new(stale, store.clone(), store.clone(), store.clone());

    let first = service.request_mint(&scope, input("P1")).await.unwrap();
    assert!(first.requested_flag_set);

    let err = service.request_mint(&scope, input("P1")).await.unwrap_err();
    assert!(!err.is_retryable());
    let mint_id = match err {
        TraceError::DuplicateClaim {
            production_id,
            mint_id,
        } => {
            assert_eq!(production_id, "P1");
            mint_id
        }
        other => panic!("expected DuplicateClaim, got {other:?}"),
    };
    assert_ne!(mint_id, first.mint.id());

    let mints = store.mints().await;
    assert_eq!(mints.len(), 2);
    assert_eq!(mints[1].id(), mint_id);
}
