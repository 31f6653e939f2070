pub mod eligibility;
pub mod inspection;
pub mod mint_request;
pub mod model_number;

pub use crate::domain::inspection::{
    InspectionBatch, InspectionItem, InspectionResult, InspectionStatus,
};
pub use crate::domain::mint::{Mint, NewMint};
pub use crate::domain::ports::{
    BatchStore, MintStore, ModelVariation, ModelVariationLookup, PassedProductLister, ProductSync,
    RequestedFlagStore,
};
pub use crate::domain::scope::CompanyScope;
pub use crate::utils::error::Result;
