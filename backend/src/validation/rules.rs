//! Common validation rules shared across request payloads.

use validator::ValidationError;

/// Minimum accepted password length. Applied uniformly to registration,
/// password reset, and change-password.
pub const PASSWORD_MIN_LENGTH: usize = 12;

/// Validates password strength.
///
/// Requirements:
/// - At least 12 characters
/// - At least one letter and one digit
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(ValidationError::new("password_too_short"));
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(ValidationError::new("password_needs_letter_and_digit"));
    }

    Ok(())
}

/// Validates a person's display name.
///
/// Requirements:
/// - Non-empty after trimming
/// - At most 100 characters
pub fn validate_full_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 100 {
        return Err(ValidationError::new("full_name_invalid_length"));
    }
    Ok(())
}
