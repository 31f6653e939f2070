use crate::domain::inspection::InspectionBatch;
use crate::domain::ports::ModelVariationLookup;
use crate::utils::validation::non_blank;
use std::collections::HashMap;

/// Memoizes model-number lookups for the lifetime of one usecase call.
/// Failed and empty lookups are remembered as absent too, so a batch
/// with many units of a broken model still costs one lookup.
pub struct ModelNumberResolver<'a, M: ModelVariationLookup + ?Sized> {
    lookup: &'a M,
    cache: HashMap<String, Option<String>>,
}

impl<'a, M: ModelVariationLookup + ?Sized> ModelNumberResolver<'a, M> {
    pub fn new(lookup: &'a M) -> Self {
        Self {
            lookup,
            cache: HashMap::new(),
        }
    }

    pub async fn resolve(&mut self, model_id: &str) -> Option<String> {
        let model_id = non_blank(model_id)?;
        if let Some(cached) = self.cache.get(model_id) {
            return cached.clone();
        }

        let resolved = match self.lookup.get_by_model_id(model_id).await {
            Ok(variation) => non_blank(&variation.model_number).map(str::to_string),
            Err(e) => {
                tracing::warn!(model_id, error = %e, "model number lookup failed");
                None
            }
        };
        self.cache.insert(model_id.to_string(), resolved.clone());
        resolved
    }

    /// Fills in missing model numbers on `batch`; items that already have
    /// one are left alone.
    pub async fn enrich(&mut self, batch: &mut InspectionBatch) {
        for item in batch.inspections.iter_mut() {
            if item.model_number.as_deref().and_then(non_blank).is_some() {
                continue;
            }
            item.model_number = self.resolve(&item.model_id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::inspection::InspectionItem;
    use crate::domain::ports::ModelVariation;
    use crate::utils::error::{Result, TraceError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLookup {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelVariationLookup for CountingLookup {
        async fn get_by_model_id(&self, model_id: &str) -> Result<ModelVariation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match model_id {
                "M1" => Ok(ModelVariation {
                    model_number: "MN-001".into(),
                }),
                "EMPTY" => Ok(ModelVariation {
                    model_number: "  ".into(),
                }),
                _ => Err(TraceError::Store {
                    message: "no such model".into(),
                }),
            }
        }
    }

    fn lookup() -> CountingLookup {
        CountingLookup {
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn repeated_models_are_looked_up_once() {
        let lookup = lookup();
        let mut resolver = ModelNumberResolver::new(&lookup);
        let mut batch = InspectionBatch::new(
            "P1",
            vec![
                InspectionItem::new("a", "M1"),
                InspectionItem::new("b", "M1"),
                InspectionItem::new("c", "M1"),
            ],
        )
        .unwrap();

        resolver.enrich(&mut batch).await;

        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        assert!(batch
            .inspections
            .iter()
            .all(|i| i.model_number.as_deref() == Some("MN-001")));
    }

    #[tokio::test]
    async fn failed_and_empty_lookups_leave_items_without_model_number() {
        let lookup = lookup();
        let mut resolver = ModelNumberResolver::new(&lookup);
        let mut batch = InspectionBatch::new(
            "P1",
            vec![
                InspectionItem::new("a", "MISSING"),
                InspectionItem::new("b", "EMPTY"),
                InspectionItem::new("c", "MISSING"),
                InspectionItem::new("d", "M1"),
            ],
        )
        .unwrap();

        resolver.enrich(&mut batch).await;

        assert_eq!(batch.inspections[0].model_number, None);
        assert_eq!(batch.inspections[1].model_number, None);
        assert_eq!(batch.inspections[3].model_number.as_deref(), Some("MN-001"));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 3);
        assert_eq!(resolver.cache.len(), 3);
    }

    #[tokio::test]
    async fn existing_model_numbers_are_kept() {
        let lookup = lookup();
        let mut resolver = ModelNumberResolver::new(&lookup);
        let mut item = InspectionItem::new("a", "M1");
        item.model_number = Some("CUSTOM".into());
        let mut batch = InspectionBatch::new("P1", vec![item]).unwrap();

        resolver.enrich(&mut batch).await;

        assert_eq!(batch.inspections[0].model_number.as_deref(), Some("CUSTOM"));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }
}
