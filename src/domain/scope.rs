use crate::utils::error::{Result, TraceError};
use crate::utils::validation::{clean_ids, non_blank};

/// The productions a single company may see, as resolved from its
/// product blueprints by an outside collaborator. Passed-unit listings
/// only ever run against one of these, never unscoped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyScope {
    company_id: String,
    production_ids: Vec<String>,
}

impl CompanyScope {
    pub fn new<I, S>(company_id: &str, production_ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let company_id = non_blank(company_id).ok_or(TraceError::MissingCompanyScope)?;
        Ok(Self {
            company_id: company_id.to_string(),
            production_ids: clean_ids(production_ids),
        })
    }

    pub fn company_id(&self) -> &str {
        &self.company_id
    }

    pub fn production_ids(&self) -> &[String] {
        &self.production_ids
    }

    pub fn contains(&self, production_id: &str) -> bool {
        self.production_ids.iter().any(|p| p == production_id)
    }

    /// Narrows the scope to a single production it already contains.
    pub fn narrow(&self, production_id: &str) -> Result<Self> {
        let production_id = production_id.trim();
        if !self.contains(production_id) {
            return Err(TraceError::OutOfScope {
                company_id: self.company_id.clone(),
                production_id: production_id.to_string(),
            });
        }
        Ok(Self {
            company_id: self.company_id.clone(),
            production_ids: vec![production_id.to_string()],
        })
    }
}
