//! Mint authorization requests.
//!
//! A [`Mint`] ties the passed units of one production to a tokenization
//! request. It is created unminted and only the methods here move it
//! between the minted and unminted states, so `minted` and `minted_at`
//! always agree.

use crate::utils::error::{Result, TraceError};
use crate::utils::time;
use crate::utils::validation::{clean_ids, non_blank};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input to [`Mint::new`]. Fields are taken as received; the constructor
/// does the cleaning.
#[derive(Debug, Clone, Default)]
pub struct NewMint {
    pub inspection_id: String,
    pub brand_id: String,
    pub token_blueprint_id: String,
    pub products: Vec<String>,
    pub created_by: String,
    pub created_at: Option<DateTime<Utc>>,
    pub scheduled_burn_date: Option<DateTime<Utc>>,
}

/// Stored shape of a mint. Deserialization goes through
/// [`Mint::restore`], so a record whose flags disagree never becomes a
/// `Mint`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRecord {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "inspectionID")]
    pub inspection_id: String,
    #[serde(rename = "brandID")]
    pub brand_id: String,
    #[serde(rename = "tokenBlueprintID")]
    pub token_blueprint_id: String,
    pub products: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub minted: bool,
    #[serde(default)]
    pub minted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_burn_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MintRecord", into = "MintRecord")]
pub struct Mint {
    id: String,
    inspection_id: String,
    brand_id: String,
    token_blueprint_id: String,
    products: Vec<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    minted: bool,
    minted_at: Option<DateTime<Utc>>,
    scheduled_burn_date: Option<DateTime<Utc>>,
}

impl Mint {
    /// Validates in a fixed order: brand, token blueprint, products,
    /// creator, creation time. The id is left empty for the store to
    /// assign.
    pub fn new(input: NewMint) -> Result<Self> {
        let brand_id = non_blank(&input.brand_id).ok_or(TraceError::InvalidBrandID)?;
        let token_blueprint_id =
            non_blank(&input.token_blueprint_id).ok_or(TraceError::InvalidTokenBlueprintID)?;

        let products = clean_ids(&input.products);
        if products.is_empty() {
            return Err(TraceError::InvalidProducts);
        }

        let created_by = non_blank(&input.created_by).ok_or(TraceError::InvalidCreatedBy)?;
        let created_at = input
            .created_at
            .filter(|at| !time::is_zero(at))
            .ok_or(TraceError::InvalidCreatedAt)?;

        let mint = Self {
            id: String::new(),
            inspection_id: input.inspection_id.trim().to_string(),
            brand_id: brand_id.to_string(),
            token_blueprint_id: token_blueprint_id.to_string(),
            products,
            created_by: created_by.to_string(),
            created_at,
            minted: false,
            minted_at: None,
            scheduled_burn_date: input.scheduled_burn_date,
        };
        mint.validate()?;
        Ok(mint)
    }

    pub fn restore(record: MintRecord) -> Result<Self> {
        let mint = Self {
            id: record.id,
            inspection_id: record.inspection_id,
            brand_id: record.brand_id,
            token_blueprint_id: record.token_blueprint_id,
            products: record.products,
            created_by: record.created_by,
            created_at: record.created_at,
            minted: record.minted,
            minted_at: record.minted_at,
            scheduled_burn_date: record.scheduled_burn_date,
        };
        mint.validate()?;
        Ok(mint)
    }

    /// Full invariant check, run after construction and every mutation.
    pub fn validate(&self) -> Result<()> {
        if non_blank(&self.brand_id).is_none() {
            return Err(TraceError::InvalidBrandID);
        }
        if non_blank(&self.token_blueprint_id).is_none() {
            return Err(TraceError::InvalidTokenBlueprintID);
        }
        if self.products.is_empty() || self.products.iter().any(|p| non_blank(p).is_none()) {
            return Err(TraceError::InvalidProducts);
        }
        if non_blank(&self.created_by).is_none() {
            return Err(TraceError::InvalidCreatedBy);
        }
        if time::is_zero(&self.created_at) {
            return Err(TraceError::InvalidCreatedAt);
        }

        let stamped = self.minted_at.is_some_and(|at| !time::is_zero(&at));
        if self.minted != stamped || (!self.minted && self.minted_at.is_some()) {
            return Err(TraceError::Inconsistent {
                minted: self.minted,
                minted_at: self.minted_at,
            });
        }
        Ok(())
    }

    pub fn mark_minted(&mut self, at: DateTime<Utc>) -> Result<()> {
        if time::is_zero(&at) {
            return Err(TraceError::InvalidMintedAt);
        }
        let previous = (self.minted, self.minted_at);
        self.minted = true;
        self.minted_at = Some(at);
        if let Err(e) = self.validate() {
            (self.minted, self.minted_at) = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Returns the mint to the unminted state so it can be minted again.
    pub fn reset_minted(&mut self) {
        self.minted = false;
        self.minted_at = None;
    }

    pub(crate) fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn inspection_id(&self) -> &str {
        &self.inspection_id
    }

    pub fn brand_id(&self) -> &str {
        &self.brand_id
    }

    pub fn token_blueprint_id(&self) -> &str {
        &self.token_blueprint_id
    }

    pub fn products(&self) -> &[String] {
        &self.products
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_minted(&self) -> bool {
        self.minted
    }

    pub fn minted_at(&self) -> Option<DateTime<Utc>> {
        self.minted_at
    }

    pub fn scheduled_burn_date(&self) -> Option<DateTime<Utc>> {
        self.scheduled_burn_date
    }
}

impl TryFrom<MintRecord> for Mint {
    type Error = TraceError;

    fn try_from(record: MintRecord) -> Result<Self> {
        Mint::restore(record)
    }
}

impl From<Mint> for MintRecord {
    fn from(mint: Mint) -> Self {
        Self {
            id: mint.id,
            inspection_id: mint.inspection_id,
            brand_id: mint.brand_id,
            token_blueprint_id: mint.token_blueprint_id,
            products: mint.products,
            created_by: mint.created_by,
            created_at: mint.created_at,
            minted: mint.minted,
            minted_at: mint.minted_at,
            scheduled_burn_date: mint.scheduled_burn_date,
        }
    }
}
