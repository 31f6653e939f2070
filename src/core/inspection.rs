use crate::core::model_number::ModelNumberResolver;
use crate::domain::inspection::{InspectionBatch, InspectionResult, InspectionStatus};
use crate::domain::ports::{BatchStore, ModelVariationLookup, ProductSync};
use crate::utils::error::{Result, TraceError};
use crate::utils::time;
use crate::utils::validation::{non_blank, validate_production_id};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Partial update for one inspection item. `None` means "leave as is";
/// there is no way to clear a field through a patch.
#[derive(Debug, Clone, Default)]
pub struct InspectionItemPatch {
    pub result: Option<String>,
    pub inspected_by: Option<String>,
    pub inspected_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

impl InspectionItemPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result(mut self, result: impl ToString) -> Self {
        self.result = Some(result.to_string());
        self
    }

    pub fn inspected_by(mut self, by: impl Into<String>) -> Self {
        self.inspected_by = Some(by.into());
        self
    }

    pub fn inspected_at(mut self, at: DateTime<Utc>) -> Self {
        self.inspected_at = Some(at);
        self
    }

    pub fn status(mut self, status: impl ToString) -> Self {
        self.status = Some(status.to_string());
        self
    }

    fn parse(&self) -> Result<ParsedPatch> {
        let result = self
            .result
            .as_deref()
            .map(str::parse::<InspectionResult>)
            .transpose()?;

        let inspected_by = match self.inspected_by.as_deref() {
            Some(by) => Some(non_blank(by).ok_or(TraceError::InvalidInspectedBy)?.to_string()),
            None => None,
        };

        if let Some(at) = &self.inspected_at {
            if time::is_zero(at) {
                return Err(TraceError::InvalidInspectedAt);
            }
        }

        let status = self
            .status
            .as_deref()
            .map(str::parse::<InspectionStatus>)
            .transpose()?;

        Ok(ParsedPatch {
            result,
            inspected_by,
            inspected_at: self.inspected_at,
            status,
        })
    }
}

struct ParsedPatch {
    result: Option<InspectionResult>,
    inspected_by: Option<String>,
    inspected_at: Option<DateTime<Utc>>,
    status: Option<InspectionStatus>,
}

/// How hard the orchestrator tries each product write before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            retry_delay: Duration::ZERO,
        }
    }
}

/// Mutates inspection batches and keeps the per-unit product store in
/// step with them.
///
/// The batch write always happens first. A failing product write is
/// returned as [`TraceError::ProductSync`] with the batch already saved;
/// [`InspectionOrchestrator::resync_products`] replays the product side.
pub struct InspectionOrchestrator<B: ?Sized, M: ?Sized, P: ?Sized> {
    batches: Arc<B>,
    models: Arc<M>,
    products: Arc<P>,
    sync_policy: SyncPolicy,
}

impl<B, M, P> InspectionOrchestrator<B, M, P>
where
    B: BatchStore + ?Sized,
    M: ModelVariationLookup + ?Sized,
    P: ProductSync + ?Sized,
{
    pub fn new(batches: Arc<B>, models: Arc<M>, products: Arc<P>) -> Self {
        Self {
            batches,
            models,
            products,
            sync_policy: SyncPolicy::default(),
        }
    }

    pub fn with_sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.sync_policy = policy;
        self
    }

    async fn load(&self, production_id: &str) -> Result<InspectionBatch> {
        let production_id = validate_production_id(production_id)?;
        self.batches
            .get_by_production_id(production_id)
            .await?
            .ok_or_else(|| TraceError::BatchNotFound {
                production_id: production_id.to_string(),
            })
    }

    async fn enrich(&self, batch: &mut InspectionBatch) {
        ModelNumberResolver::new(self.models.as_ref())
            .enrich(batch)
            .await;
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_batch(&self, production_id: &str) -> Result<InspectionBatch> {
        let mut batch = self.load(production_id).await?;
        self.enrich(&mut batch).await;
        Ok(batch)
    }

    #[tracing::instrument(skip(self, patch, cancel))]
    pub async fn update_item(
        &self,
        production_id: &str,
        product_id: &str,
        patch: InspectionItemPatch,
        cancel: &CancellationToken,
    ) -> Result<InspectionBatch> {
        let mut batch = self.load(production_id).await?;
        let product_id = non_blank(product_id).ok_or_else(|| TraceError::InvalidProductIDs {
            message: "product id must not be empty".to_string(),
        })?;

        let index = batch
            .inspections
            .iter()
            .position(|i| i.product_id == product_id)
            .ok_or_else(|| TraceError::InvalidProductIDs {
                message: format!(
                    "product {product_id:?} is not part of production {}",
                    batch.production_id
                ),
            })?;

        let parsed = patch.parse()?;
        if let Some(next) = parsed.status {
            if !batch.status.can_transition_to(next) {
                return Err(TraceError::InvalidStatusTransition {
                    from: batch.status.to_string(),
                    to: next.to_string(),
                });
            }
        }

        let item = &mut batch.inspections[index];
        if let Some(result) = parsed.result {
            item.inspection_result = Some(result);
        }
        if let Some(by) = parsed.inspected_by {
            item.inspected_by = Some(by);
        }
        if let Some(at) = parsed.inspected_at {
            item.inspected_at = Some(at);
        }
        if let Some(status) = parsed.status {
            batch.status = status;
        }
        batch.recompute_total_passed();

        ensure_active(cancel, "saving the batch")?;
        let mut saved = self.batches.save(batch).await?;
        tracing::debug!(
            product_id,
            total_passed = saved.total_passed,
            version = saved.version,
            "inspection item updated"
        );
        self.enrich(&mut saved).await;

        if let Some(result) = parsed.result {
            ensure_active(cancel, "syncing the product")?;
            self.sync_one(product_id, result).await.map_err(|e| {
                tracing::error!(product_id, error = %e, "product sync failed after batch update");
                TraceError::ProductSync {
                    product_id: product_id.to_string(),
                    synced: 0,
                    message: e.to_string(),
                }
            })?;
        }

        Ok(saved)
    }

    /// Closes the batch and pushes every real unit's result to the product
    /// store. Calling it again on a completed batch saves nothing and only
    /// replays the product writes.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn complete_batch(
        &self,
        production_id: &str,
        by: &str,
        at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<InspectionBatch> {
        let mut batch = self.load(production_id).await?;
        let stored_total = batch.total_passed;

        let changed = batch.complete(by, at)?;
        batch.recompute_total_passed();

        let mut batch = if changed || batch.total_passed != stored_total {
            ensure_active(cancel, "saving the batch")?;
            let saved = self.batches.save(batch).await?;
            tracing::info!(
                production_id = %saved.production_id,
                total_passed = saved.total_passed,
                "inspection batch completed"
            );
            saved
        } else {
            tracing::debug!("inspection batch already completed");
            batch
        };
        self.enrich(&mut batch).await;

        self.sync_all(&batch, cancel).await?;
        Ok(batch)
    }

    /// Replays product writes for a batch whose earlier sync stopped part
    /// way. Returns how many products were written.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn resync_products(
        &self,
        production_id: &str,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let batch = self.load(production_id).await?;
        self.sync_all(&batch, cancel).await
    }

    async fn sync_all(&self, batch: &InspectionBatch, cancel: &CancellationToken) -> Result<usize> {
        let mut synced = 0;
        for item in &batch.inspections {
            let Some(result) = item.inspection_result else {
                continue;
            };
            if result == InspectionResult::NotManufactured || item.product_id.is_empty() {
                continue;
            }

            ensure_active(cancel, "syncing the next product")?;
            if let Err(e) = self.sync_one(&item.product_id, result).await {
                tracing::error!(
                    product_id = %item.product_id,
                    synced,
                    error = %e,
                    "product sync aborted"
                );
                return Err(TraceError::ProductSync {
                    product_id: item.product_id.clone(),
                    synced,
                    message: e.to_string(),
                });
            }
            synced += 1;
        }
        tracing::debug!(synced, "product sync finished");
        Ok(synced)
    }

    async fn sync_one(&self, product_id: &str, result: InspectionResult) -> Result<()> {
        let attempts = self.sync_policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.products.update_inspection_result(product_id, result).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    tracing::warn!(product_id, attempt, error = %e, "retrying product sync");
                    attempt += 1;
                    if !self.sync_policy.retry_delay.is_zero() {
                        tokio::time::sleep(self.sync_policy.retry_delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn ensure_active(cancel: &CancellationToken, stage: &str) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(TraceError::Cancelled {
            stage: stage.to_string(),
        });
    }
    Ok(())
}
