pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{Cli, Command};

pub use adapters::MemoryStore;
pub use config::TraceConfig;
pub use crate::core::eligibility::{EligibleProducts, MintEligibilityCollector};
pub use crate::core::inspection::{InspectionItemPatch, InspectionOrchestrator, SyncPolicy};
pub use crate::core::mint_request::{MintRequestInput, MintRequestOutcome, MintRequestService};
pub use utils::error::{ErrorCategory, Result, TraceError};
