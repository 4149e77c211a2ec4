/// Input validators for login requests
/// Features:
/// 1. DoS Protection: Input length limits (bcrypt work is only done on sane input)
/// 2. Format checks: usernames are restricted to a conservative character set
/// 3. Control character rejection

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_USERNAME_LENGTH: usize = 64;
// bcrypt only looks at the first 72 bytes; longer input is rejected outright
const MAX_PASSWORD_LENGTH: usize = 72;

lazy_static! {
    // letters, digits and the separators common in handles and email addresses
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._@+-]*$").unwrap();
}

/// Validates a username
/// - Trims surrounding whitespace
/// - Checks length constraints
/// - Restricts the character set
pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }

    if trimmed.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong(
            "username".to_string(),
            MAX_USERNAME_LENGTH,
        ));
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::SuspiciousContent("username".to_string()));
    }

    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a login password before it reaches bcrypt
///
/// Only shape is checked here; strength rules belong to account creation.
pub fn is_valid_password_input(password: &str) -> Result<&str, ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        ));
    }

    if password.contains('\0') {
        return Err(ValidationError::SuspiciousContent("password".to_string()));
    }

    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_username() {
        assert_eq!(is_valid_username("alice").unwrap(), "alice");
        assert_eq!(is_valid_username("  bob.smith ").unwrap(), "bob.smith");
        assert!(is_valid_username("user+tag@example.com").is_ok());
    }

    #[test]
    fn test_invalid_username_format() {
        assert!(matches!(
            is_valid_username("-leading-dash"),
            Err(ValidationError::InvalidFormat(_))
        ));
        assert!(is_valid_username("has space").is_err());
        assert!(is_valid_username("quote'injection").is_err());
    }

    #[test]
    fn test_username_length_limits() {
        assert!(matches!(
            is_valid_username("   "),
            Err(ValidationError::EmptyField(_))
        ));

        let too_long = "a".repeat(MAX_USERNAME_LENGTH + 1);
        assert!(matches!(
            is_valid_username(&too_long),
            Err(ValidationError::TooLong(_, MAX_USERNAME_LENGTH))
        ));
    }

    #[test]
    fn test_control_characters() {
        assert!(matches!(
            is_valid_username("name\u{7}"),
            Err(ValidationError::SuspiciousContent(_))
        ));
        assert!(is_valid_password_input("pass\0word").is_err());
    }

    #[test]
    fn test_password_input() {
        assert_eq!(is_valid_password_input("Wonderland1").unwrap(), "Wonderland1");
        // surrounding whitespace is part of the password
        assert_eq!(is_valid_password_input(" spaced ").unwrap(), " spaced ");
        assert!(is_valid_password_input("").is_err());
        assert!(is_valid_password_input(&"a".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
    }
}
