use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("invalid production id: {value:?}")]
    InvalidProductionID { value: String },

    #[error("invalid product ids: {message}")]
    InvalidProductIDs { message: String },

    #[error("invalid inspection result: {value:?}")]
    InvalidInspectionResult { value: String },

    #[error("inspected_by must not be empty")]
    InvalidInspectedBy,

    #[error("inspected_at must not be zero")]
    InvalidInspectedAt,

    #[error("invalid inspection status: {value:?}")]
    InvalidInspectionStatus { value: String },

    #[error("invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("invalid timestamp for {field}")]
    InvalidTimestamp { field: String },

    #[error("brand_id must not be empty")]
    InvalidBrandID,

    #[error("token_blueprint_id must not be empty")]
    InvalidTokenBlueprintID,

    #[error("products must contain at least one non-empty id")]
    InvalidProducts,

    #[error("created_by must not be empty")]
    InvalidCreatedBy,

    #[error("created_at must not be zero")]
    InvalidCreatedAt,

    #[error("minted_at must not be zero")]
    InvalidMintedAt,

    #[error("inspection batch not found for production {production_id}")]
    BatchNotFound { production_id: String },

    #[error("inconsistent mint state: minted={minted}, minted_at={minted_at:?}")]
    Inconsistent {
        minted: bool,
        minted_at: Option<DateTime<Utc>>,
    },

    #[error("product sync failed for {product_id} after {synced} synced item(s): {message}")]
    ProductSync {
        product_id: String,
        synced: usize,
        message: String,
    },

    #[error("version conflict on production {production_id}: expected {expected}, found {found}")]
    VersionConflict {
        production_id: String,
        expected: u64,
        found: u64,
    },

    #[error("operation cancelled before {stage}")]
    Cancelled { stage: String },

    #[error("production {production_id} has already been requested for minting")]
    AlreadyRequested { production_id: String },

    #[error("mint {mint_id} was stored but production {production_id} was claimed by another request")]
    DuplicateClaim {
        production_id: String,
        mint_id: String,
    },

    #[error("production {production_id} is outside the scope of company {company_id}")]
    OutOfScope {
        company_id: String,
        production_id: String,
    },

    #[error("a company scope is required for this listing")]
    MissingCompanyScope,

    #[error("store error: {message}")]
    Store { message: String },

    #[error("configuration error in {field}: {message}")]
    Config { field: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller-correctable input; never retried automatically.
    Validation,
    NotFound,
    /// A mint whose minted flag and timestamp disagree.
    Consistency,
    /// The batch write succeeded but a product write did not.
    SyncFailure,
    Conflict,
    Infrastructure,
}

impl TraceError {
    pub fn category(&self) -> ErrorCategory {
        use TraceError::*;
        match self {
            InvalidProductionID { .. }
            | InvalidProductIDs { .. }
            | InvalidInspectionResult { .. }
            | InvalidInspectedBy
            | InvalidInspectedAt
            | InvalidInspectionStatus { .. }
            | InvalidStatusTransition { .. }
            | InvalidTimestamp { .. }
            | InvalidBrandID
            | InvalidTokenBlueprintID
            | InvalidProducts
            | InvalidCreatedBy
            | InvalidCreatedAt
            | InvalidMintedAt
            | OutOfScope { .. }
            | MissingCompanyScope
            | Config { .. } => ErrorCategory::Validation,
            BatchNotFound { .. } => ErrorCategory::NotFound,
            Inconsistent { .. } => ErrorCategory::Consistency,
            ProductSync { .. } => ErrorCategory::SyncFailure,
            VersionConflict { .. } | AlreadyRequested { .. } | DuplicateClaim { .. } => {
                ErrorCategory::Conflict
            }
            Cancelled { .. } | Store { .. } | Io(_) | Serialization(_) => {
                ErrorCategory::Infrastructure
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            TraceError::AlreadyRequested { .. } | TraceError::DuplicateClaim { .. } => false,
            other => matches!(
                other.category(),
                ErrorCategory::SyncFailure | ErrorCategory::Conflict | ErrorCategory::Infrastructure
            ),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            TraceError::ProductSync { .. } => {
                "The batch is already saved; run `resync` for this production instead of repeating the update"
            }
            TraceError::VersionConflict { .. } => {
                "Another writer updated the batch; reload and apply the change again"
            }
            TraceError::AlreadyRequested { .. } => {
                "Passed units of this production are already claimed by a mint request"
            }
            TraceError::DuplicateClaim { .. } => {
                "Two mints now claim the same units; cancel the mint named in the error"
            }
            TraceError::Inconsistent { .. } => {
                "The stored mint was modified outside this service; reconcile minted and minted_at"
            }
            TraceError::Cancelled { .. } => "Retry the operation; committed writes are kept",
            TraceError::BatchNotFound { .. } => "Create the inspection batch for this production first",
            TraceError::Config { .. } => "Check the configuration file and environment variables",
            TraceError::Store { .. } | TraceError::Io(_) | TraceError::Serialization(_) => {
                "Check the backing store and retry"
            }
            _ => "Correct the input and submit it again",
        }
    }
}

pub type Result<T> = std::result::Result<T, TraceError>;
