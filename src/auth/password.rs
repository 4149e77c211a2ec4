/// Password Hashing and Verification
///
/// bcrypt hashing for the credential store.

use bcrypt::hash;

use crate::error::AppError;

pub use bcrypt::DEFAULT_COST;

/// Hash a password using bcrypt
///
/// # Arguments
/// * `password` - Plain text password to hash
/// * `cost` - bcrypt work factor (4..=31)
///
/// # Errors
/// Returns error if bcrypt hashing fails
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// A malformed stored hash counts as a mismatch, so the caller never
/// leaks the difference between "bad hash" and "bad password".
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::error!("Password verification failed: {}", e);
            false
        }
    }
}
