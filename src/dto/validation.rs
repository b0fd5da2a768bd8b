//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::services::outcome::FinalScore;

/// Validates that a final score reads `h-a` with non-negative integers.
///
/// # Examples
///
/// ```ignore
/// validate_score("2-1")   // Ok
/// validate_score("2 - 1") // Ok
/// validate_score("2:1")   // Err - wrong separator
/// ```
pub fn validate_score(score: &str) -> Result<(), ValidationError> {
    if FinalScore::parse(score).is_some() {
        return Ok(());
    }

    let mut err = ValidationError::new("final_score_format");
    err.message = Some(format!("Final score must look like 2-1 (got {score:?})").into());
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_score_valid() {
        assert!(validate_score("2-1").is_ok());
        assert!(validate_score("0 - 0").is_ok());
        assert!(validate_score("10-3").is_ok());
    }

    #[test]
    fn test_validate_score_invalid() {
        assert!(validate_score("").is_err());
        assert!(validate_score("2:1").is_err());
        assert!(validate_score("-1-2").is_err());
        assert!(validate_score("deux-un").is_err());
    }
}
