use crate::utils::error::{PipelineError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(PipelineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(PipelineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PipelineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Every name in `names` must refer to a declared schema column.
pub fn validate_known_columns(
    field_name: &str,
    names: &[String],
    schema_columns: &[String],
) -> Result<()> {
    let known: HashSet<&str> = schema_columns.iter().map(String::as_str).collect();

    for name in names {
        if !known.contains(name.as_str()) {
            return Err(PipelineError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: name.clone(),
                reason: format!(
                    "Unknown column. Declared columns: {}",
                    schema_columns.join(", ")
                ),
            });
        }
    }

    Ok(())
}

pub fn validate_range_bounds(field_name: &str, min: f64, max: f64) -> Result<()> {
    if min > max {
        return Err(PipelineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: format!("{}..{}", min, max),
            reason: "min must not exceed max".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("input.path", "./data.csv").is_ok());
        assert!(validate_path("input.path", "").is_err());
        assert!(validate_path("input.path", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_known_columns() {
        let schema = vec!["Region".to_string(), "Total_Sales".to_string()];
        assert!(
            validate_known_columns("processing.group_by", &["Region".to_string()], &schema).is_ok()
        );
        assert!(
            validate_known_columns("processing.group_by", &["Country".to_string()], &schema)
                .is_err()
        );
    }

    #[test]
    fn test_validate_range_bounds() {
        assert!(validate_range_bounds("rule.range", 0.0, 10.0).is_ok());
        assert!(validate_range_bounds("rule.range", 10.0, 0.0).is_err());
    }
}
