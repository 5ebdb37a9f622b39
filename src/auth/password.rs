/// Password Hashing and Verification
///
/// bcrypt with a fixed work factor. Every hash gets a fresh random salt, which
/// bcrypt embeds in the output string together with the cost.

use bcrypt::{hash, verify};

use crate::error::AuthError;

/// bcrypt work factor used for new credentials
const HASH_COST: u32 = 10;

/// bcrypt ignores input past this many bytes, so longer passwords are refused
/// instead of silently truncated.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a plaintext password into a storable credential
///
/// # Errors
/// Returns `AuthError::HashingFailed` if the password is longer than
/// `MAX_PASSWORD_BYTES` or bcrypt cannot produce a hash. The caller must not
/// persist anything in that case.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::HashingFailed(format!(
            "password exceeds {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }

    hash(password, HASH_COST).map_err(|e| AuthError::HashingFailed(e.to_string()))
}

/// Verify a plaintext candidate against a stored credential
///
/// Only two outcomes are visible to the caller: match or mismatch. A bcrypt
/// error (for example a corrupt stored hash) is logged and reported as a
/// mismatch. A candidate past `MAX_PASSWORD_BYTES` never matches.
pub fn verify_password(password: &str, credential: &str) -> Result<(), AuthError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::PasswordMismatch);
    }

    match verify(password, credential) {
        Ok(true) => Ok(()),
        Ok(false) => Err(AuthError::PasswordMismatch),
        Err(e) => {
            tracing::error!(error = %e, "Password verification errored");
            Err(AuthError::PasswordMismatch)
        }
    }
}
