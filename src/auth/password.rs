//! Password hashing and verification using Argon2
//!
//! Uses the argon2id variant with the crate's recommended parameters. Only
//! the local identity provider stores hashes; production logins never see
//! one.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::credentials::SecretString;
use crate::types::ClientError;

/// Hash a password using Argon2id
///
/// Returns the PHC-formatted hash string that includes the salt and parameters.
pub fn hash_password(password: &SecretString) -> Result<String, ClientError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.expose().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ClientError::Authentication(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored PHC hash
pub fn verify_password(password: &SecretString, hash: &str) -> Result<bool, ClientError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| ClientError::Configuration(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.expose().as_bytes(), &parsed_hash)
        .is_ok())
}
