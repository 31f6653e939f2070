use crate::utils::error::{Result, TraceError};
use crate::utils::validation::{non_blank, validate_production_id};
use crate::utils::time;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Terminal per-unit inspection outcome. An item without one has not
/// been inspected yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InspectionResult {
    Passed,
    Failed,
    /// No physical unit was produced for this slot.
    NotManufactured,
}

impl InspectionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::NotManufactured => "notManufactured",
        }
    }
}

impl fmt::Display for InspectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InspectionResult {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "passed" => Ok(Self::Passed),
            "failed" => Ok(Self::Failed),
            "notManufactured" => Ok(Self::NotManufactured),
            other => Err(TraceError::InvalidInspectionResult {
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InspectionStatus {
    #[default]
    Pending,
    Completed,
}

impl InspectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    /// Status only ever moves forward; reopening is not supported.
    pub fn can_transition_to(&self, next: InspectionStatus) -> bool {
        !(*self == Self::Completed && next == Self::Pending)
    }
}

impl fmt::Display for InspectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InspectionStatus {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(TraceError::InvalidInspectionStatus {
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionItem {
    #[serde(rename = "productID")]
    pub product_id: String,

    #[serde(rename = "modelID")]
    pub model_id: String,

    /// Display enrichment only; never authoritative and never persisted
    /// by the orchestrator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_number: Option<String>,

    #[serde(default)]
    pub inspection_result: Option<InspectionResult>,

    #[serde(default)]
    pub inspected_by: Option<String>,

    #[serde(default)]
    pub inspected_at: Option<DateTime<Utc>>,
}

impl InspectionItem {
    pub fn new(product_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            model_id: model_id.into(),
            model_number: None,
            inspection_result: None,
            inspected_by: None,
            inspected_at: None,
        }
    }

    pub fn with_result(mut self, result: InspectionResult) -> Self {
        self.inspection_result = Some(result);
        self
    }

    pub fn is_passed(&self) -> bool {
        self.inspection_result == Some(InspectionResult::Passed)
    }
}

/// All inspection results for one production run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionBatch {
    #[serde(rename = "productionID")]
    pub production_id: String,

    #[serde(default)]
    pub inspections: Vec<InspectionItem>,

    #[serde(default)]
    pub status: InspectionStatus,

    #[serde(default)]
    pub total_passed: usize,

    /// Set once a mint request has claimed this batch's passed units.
    #[serde(default)]
    pub requested: bool,

    /// Optimistic concurrency token, bumped by the store on every save.
    #[serde(default)]
    pub version: u64,
}

impl InspectionBatch {
    pub fn new(production_id: &str, inspections: Vec<InspectionItem>) -> Result<Self> {
        let production_id = validate_production_id(production_id)?.to_string();
        let mut batch = Self {
            production_id,
            inspections,
            status: InspectionStatus::Pending,
            total_passed: 0,
            requested: false,
            version: 0,
        };
        batch.validate()?;
        batch.recompute_total_passed();
        Ok(batch)
    }

    /// Checks the production id and that every product id is non-blank and
    /// unique within the batch.
    pub fn validate(&self) -> Result<()> {
        validate_production_id(&self.production_id)?;

        let mut seen = HashSet::new();
        for item in &self.inspections {
            let id = non_blank(&item.product_id).ok_or_else(|| TraceError::InvalidProductIDs {
                message: "product id must not be empty".to_string(),
            })?;
            if !seen.insert(id) {
                return Err(TraceError::InvalidProductIDs {
                    message: format!("duplicate product id {id:?}"),
                });
            }
        }
        Ok(())
    }

    pub fn recompute_total_passed(&mut self) {
        self.total_passed = self.inspections.iter().filter(|i| i.is_passed()).count();
    }

    pub fn item(&self, product_id: &str) -> Option<&InspectionItem> {
        self.inspections.iter().find(|i| i.product_id == product_id)
    }

    pub fn passed_product_ids(&self) -> Vec<String> {
        self.inspections
            .iter()
            .filter(|i| i.is_passed())
            .map(|i| i.product_id.clone())
            .collect()
    }

    /// Marks every uninspected item `notManufactured`, recording `by` and
    /// `at` on those items, and closes the batch. Returns whether anything
    /// changed, so a repeated call can be recognised as a no-op.
    pub fn complete(&mut self, by: &str, at: DateTime<Utc>) -> Result<bool> {
        if time::is_zero(&at) {
            return Err(TraceError::InvalidTimestamp {
                field: "completed_at".to_string(),
            });
        }
        let by = non_blank(by).ok_or(TraceError::InvalidInspectedBy)?;

        let mut changed = false;
        for item in self
            .inspections
            .iter_mut()
            .filter(|i| i.inspection_result.is_none())
        {
            item.inspection_result = Some(InspectionResult::NotManufactured);
            item.inspected_by = Some(by.to_string());
            item.inspected_at = Some(at);
            changed = true;
        }

        if self.status != InspectionStatus::Completed {
            self.status = InspectionStatus::Completed;
            changed = true;
        }

        Ok(changed)
    }

    pub fn is_completed(&self) -> bool {
        self.status == InspectionStatus::Completed
    }
}
