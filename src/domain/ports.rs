use crate::domain::inspection::{InspectionBatch, InspectionResult};
use crate::domain::mint::Mint;
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait BatchStore: Send + Sync {
    async fn get_by_production_id(&self, production_id: &str) -> Result<Option<InspectionBatch>>;

    /// Single-document read-modify-write. Implementations must reject a
    /// batch whose `version` no longer matches the stored one and return
    /// the saved batch with its new version.
    async fn save(&self, batch: InspectionBatch) -> Result<InspectionBatch>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelVariation {
    pub model_number: String,
}

#[async_trait]
pub trait ModelVariationLookup: Send + Sync {
    async fn get_by_model_id(&self, model_id: &str) -> Result<ModelVariation>;
}

#[async_trait]
pub trait ProductSync: Send + Sync {
    async fn update_inspection_result(
        &self,
        product_id: &str,
        result: InspectionResult,
    ) -> Result<()>;
}

#[async_trait]
pub trait PassedProductLister: Send + Sync {
    /// `None` when the production has no inspection batch yet.
    async fn list_passed_product_ids(&self, production_id: &str) -> Result<Option<Vec<String>>>;
}

#[async_trait]
pub trait RequestedFlagStore: Send + Sync {
    async fn set_requested(&self, production_id: &str, requested: bool) -> Result<InspectionBatch>;
}

#[async_trait]
pub trait MintStore: Send + Sync {
    /// Persists a new mint, assigning an id when it has none.
    async fn create(&self, mint: Mint) -> Result<Mint>;
}
