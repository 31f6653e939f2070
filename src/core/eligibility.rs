use crate::domain::ports::PassedProductLister;
use crate::domain::scope::CompanyScope;
use crate::utils::error::Result;
use std::collections::HashSet;
use std::sync::Arc;

/// Passed units gathered for a mint, plus the scoped productions that had
/// no inspection batch. Whether a missing batch is fatal is the caller's
/// call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibleProducts {
    pub product_ids: Vec<String>,
    pub missing_productions: Vec<String>,
}

impl EligibleProducts {
    pub fn is_complete(&self) -> bool {
        self.missing_productions.is_empty()
    }
}

pub struct MintEligibilityCollector<L: ?Sized> {
    lister: Arc<L>,
}

impl<L: PassedProductLister + ?Sized> MintEligibilityCollector<L> {
    pub fn new(lister: Arc<L>) -> Self {
        Self { lister }
    }

    /// Unions the passed product ids of every production in `scope`, in
    /// scope order, first occurrence kept. Lister errors other than a
    /// missing batch abort the collection.
    #[tracing::instrument(skip(self, scope), fields(company_id = %scope.company_id()))]
    pub async fn collect(&self, scope: &CompanyScope) -> Result<EligibleProducts> {
        let mut seen = HashSet::new();
        let mut eligible = EligibleProducts::default();

        for production_id in scope.production_ids() {
            match self.lister.list_passed_product_ids(production_id).await? {
                Some(ids) => {
                    tracing::debug!(production_id = %production_id, passed = ids.len(), "listed passed units");
                    for id in ids {
                        if !id.is_empty() && seen.insert(id.clone()) {
                            eligible.product_ids.push(id);
                        }
                    }
                }
                None => {
                    tracing::debug!(production_id = %production_id, "no inspection batch yet");
                    eligible.missing_productions.push(production_id.clone());
                }
            }
        }

        Ok(eligible)
    }
}
