//! Per-endpoint request validation.
//!
//! Pure and synchronous; runs before any cache or network access. Each
//! check carries the endpoint's exact client-facing message in
//! [`OpError::InvalidInput`].

use crate::error::OpError;

/// Trim a required free-text field, rejecting absent or blank values
/// with `message`.
pub fn require_nonblank(value: Option<&str>, message: &str) -> Result<String, OpError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(OpError::InvalidInput(message.to_string())),
    }
}

/// Trim an optional free-text field; absent and blank collapse to `None`.
pub fn optional_trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

/// Check a comparison list: 2 to 3 raw entries, at least 2 usable after
/// dropping blank ones. Kept entries stay as given.
pub fn comparison_list(universities: &[String]) -> Result<Vec<String>, OpError> {
    if universities.len() < 2 {
        return Err(OpError::InvalidInput(
            "At least 2 universities are required".to_string(),
        ));
    }
    if universities.len() > 3 {
        return Err(OpError::InvalidInput(
            "Maximum 3 universities can be compared".to_string(),
        ));
    }
    let valid: Vec<String> = universities
        .iter()
        .filter(|u| !u.trim().is_empty())
        .cloned()
        .collect();
    if valid.len() < 2 {
        return Err(OpError::InvalidInput(
            "At least 2 valid university names are required".to_string(),
        ));
    }
    Ok(valid)
}
