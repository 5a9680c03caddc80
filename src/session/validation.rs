//! Form input checks run before any identity provider call.

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use super::types::Credentials;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// User-facing validation failures. The `Display` text is shown verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password must be at least {} characters", MIN_PASSWORD_LENGTH)]
    PasswordTooShort,
    #[error("Passwords do not match")]
    PasswordMismatch,
}

#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

/// Check login form input.
///
/// # Errors
/// Returns the first failing rule.
pub fn validate_credentials(credentials: &Credentials) -> Result<(), ValidationError> {
    if credentials.username.trim().is_empty() {
        return Err(ValidationError::Missing("Email"));
    }
    if credentials.password.expose_secret().is_empty() {
        return Err(ValidationError::Missing("Password"));
    }
    Ok(())
}

/// Check the username submitted on the forgot-password form.
///
/// # Errors
/// Returns the first failing rule.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ValidationError::Missing("Email"));
    }
    if username.contains('@') && !valid_email(username) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// Check a new password and its confirmation field.
///
/// # Errors
/// Returns the first failing rule.
pub fn validate_new_password(
    password: &SecretString,
    confirmation: &SecretString,
) -> Result<(), ValidationError> {
    let password = password.expose_secret();
    if password.is_empty() {
        return Err(ValidationError::Missing("Password"));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    if password != confirmation.expose_secret() {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("ana@example.com"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("ana@example"));
    }

    #[test]
    fn credentials_require_both_fields() {
        assert_eq!(
            validate_credentials(&Credentials::new(" ", "password")),
            Err(ValidationError::Missing("Email"))
        );
        assert_eq!(
            validate_credentials(&Credentials::new("ana@example.com", "")),
            Err(ValidationError::Missing("Password"))
        );
        assert!(validate_credentials(&Credentials::new("ana@example.com", "x")).is_ok());
    }

    #[test]
    fn username_checks_email_shape_only_when_it_looks_like_one() {
        assert!(validate_username("ana").is_ok());
        assert!(validate_username("ana@example.com").is_ok());
        assert_eq!(
            validate_username("ana@"),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(validate_username(""), Err(ValidationError::Missing("Email")));
    }

    #[test]
    fn new_password_enforces_length_before_match() {
        assert_eq!(
            validate_new_password(&secret("short"), &secret("other")),
            Err(ValidationError::PasswordTooShort)
        );
        assert_eq!(
            validate_new_password(&secret("long-enough"), &secret("long-enougH")),
            Err(ValidationError::PasswordMismatch)
        );
        assert!(validate_new_password(&secret("long-enough"), &secret("long-enough")).is_ok());
    }

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(
            ValidationError::PasswordTooShort.to_string(),
            "Password must be at least 8 characters"
        );
        assert_eq!(
            ValidationError::PasswordMismatch.to_string(),
            "Passwords do not match"
        );
    }
}
