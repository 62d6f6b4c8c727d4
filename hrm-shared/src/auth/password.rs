/// Password hashing with Argon2id
///
/// Hashes are PHC strings (`$argon2id$v=19$m=65536,t=3,p=4$...`) stored in
/// `users.password_hash`. Parameters are embedded in the hash, so they can
/// be raised later without invalidating existing accounts.
///
/// # Example
///
/// ```
/// use hrm_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Welcome@2024")?;
/// assert!(verify_password("Welcome@2024", &hash)?);
/// assert!(!verify_password("welcome@2024", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Error type for password operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hashes a password with Argon2id (64 MB, 3 passes, 4 lanes, random salt)
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored PHC hash in constant time
///
/// `Ok(false)` means the password is wrong; `Err` means the stored hash is
/// unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Checks the password policy for new accounts
///
/// At least 8 characters with an uppercase letter, a lowercase letter, a
/// digit and a special character. Returns the first unmet rule.
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    let rules: [(&dyn Fn(&str) -> bool, &str); 5] = [
        (&|p| p.chars().count() >= 8, "Password must be at least 8 characters long"),
        (
            &|p| p.chars().any(char::is_uppercase),
            "Password must contain at least one uppercase letter",
        ),
        (
            &|p| p.chars().any(char::is_lowercase),
            "Password must contain at least one lowercase letter",
        ),
        (
            &|p| p.chars().any(|c| c.is_ascii_digit()),
            "Password must contain at least one digit",
        ),
        (
            &|p| p.chars().any(|c| !c.is_alphanumeric()),
            "Password must contain at least one special character",
        ),
    ];

    match rules.iter().find(|(ok, _)| !ok(password)) {
        Some((_, message)) => Err((*message).to_string()),
        None => Ok(()),
    }
}
