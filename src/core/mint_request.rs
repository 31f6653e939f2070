use crate::core::eligibility::MintEligibilityCollector;
use crate::domain::mint::{Mint, NewMint};
use crate::domain::ports::{BatchStore, MintStore, PassedProductLister, RequestedFlagStore};
use crate::domain::scope::CompanyScope;
use crate::utils::error::{Result, TraceError};
use crate::utils::validation::validate_production_id;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct MintRequestInput {
    pub production_id: String,
    pub brand_id: String,
    pub token_blueprint_id: String,
    pub created_by: String,
    pub created_at: Option<DateTime<Utc>>,
    pub scheduled_burn_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct MintRequestOutcome {
    pub mint: Mint,
    /// False when the mint was stored but the batch could not be flagged.
    /// The mint stands; reconciliation sets the flag later. A batch that
    /// another request claimed in the meantime is reported as
    /// `DuplicateClaim` instead.
    pub requested_flag_set: bool,
}

/// Turns the passed units of one production into a stored mint request
/// and claims the production's batch so it cannot be requested twice.
pub struct MintRequestService<B: ?Sized, L: ?Sized, R: ?Sized, S: ?Sized> {
    batches: Arc<B>,
    collector: MintEligibilityCollector<L>,
    flags: Arc<R>,
    mints: Arc<S>,
}

impl<B, L, R, S> MintRequestService<B, L, R, S>
where
    B: BatchStore + ?Sized,
    L: PassedProductLister + ?Sized,
    R: RequestedFlagStore + ?Sized,
    S: MintStore + ?Sized,
{
    pub fn new(batches: Arc<B>, lister: Arc<L>, flags: Arc<R>, mints: Arc<S>) -> Self {
        Self {
            batches,
            collector: MintEligibilityCollector::new(lister),
            flags,
            mints,
        }
    }

    #[tracing::instrument(
        skip(self, scope, input),
        fields(company_id = %scope.company_id(), production_id = %input.production_id)
    )]
    pub async fn request_mint(
        &self,
        scope: &CompanyScope,
        input: MintRequestInput,
    ) -> Result<MintRequestOutcome> {
        let production_id = validate_production_id(&input.production_id)?.to_string();
        let scope = scope.narrow(&production_id)?;

        let batch = self
            .batches
            .get_by_production_id(&production_id)
            .await?
            .ok_or_else(|| TraceError::BatchNotFound {
                production_id: production_id.clone(),
            })?;
        if batch.requested {
            return Err(TraceError::AlreadyRequested { production_id });
        }

        let eligible = self.collector.collect(&scope).await?;
        if !eligible.is_complete() {
            return Err(TraceError::BatchNotFound { production_id });
        }

        let mint = Mint::new(NewMint {
            inspection_id: production_id.clone(),
            brand_id: input.brand_id,
            token_blueprint_id: input.token_blueprint_id,
            products: eligible.product_ids,
            created_by: input.created_by,
            created_at: input.created_at,
            scheduled_burn_date: input.scheduled_burn_date,
        })?;

        let mint = self.mints.create(mint).await?;
        tracing::info!(
            mint_id = %mint.id(),
            products = mint.products().len(),
            "mint request created"
        );

        let requested_flag_set = match self.flags.set_requested(&production_id, true).await {
            Ok(_) => true,
            Err(TraceError::AlreadyRequested { .. }) => {
                tracing::error!(
                    mint_id = %mint.id(),
                    "batch was claimed by a concurrent request after this mint was stored"
                );
                return Err(TraceError::DuplicateClaim {
                    production_id,
                    mint_id: mint.id().to_string(),
                });
            }
            Err(e) => {
                tracing::warn!(
                    mint_id = %mint.id(),
                    error = %e,
                    "mint created but batch could not be flagged as requested"
                );
                false
            }
        };

        Ok(MintRequestOutcome {
            mint,
            requested_flag_set,
        })
    }
}
