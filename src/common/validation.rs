// src/common/validation.rs

use validator::ValidationError;

/// Rejects values that are empty once surrounding whitespace is removed.
/// Callers override the message per field.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_is_blank() {
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank(" Asha ").is_ok());
    }
}
