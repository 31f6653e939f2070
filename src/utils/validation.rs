use crate::utils::error::{Result, TraceError};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Trims `value` and returns it, or `None` when nothing is left.
pub fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

pub fn validate_production_id(value: &str) -> Result<&str> {
    non_blank(value).ok_or_else(|| TraceError::InvalidProductionID {
        value: value.to_string(),
    })
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(TraceError::Config {
            field: field_name.to_string(),
            message: "path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(TraceError::Config {
            field: field_name.to_string(),
            message: "path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(TraceError::Config {
            field: field_name.to_string(),
            message: format!("value {} must be between {} and {}", value, min, max),
        });
    }
    Ok(())
}

/// Trims every id, drops the empty ones and keeps the first occurrence of
/// each remaining id, preserving input order.
pub fn clean_ids<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut cleaned = Vec::new();
    for id in ids {
        if let Some(id) = non_blank(id.as_ref()) {
            if seen.insert(id.to_string()) {
                cleaned.push(id.to_string());
            }
        }
    }
    cleaned
}
