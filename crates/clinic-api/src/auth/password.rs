//! Password hashing.
//!
//! Argon2id, stored as PHC strings in the user directory.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Password handling errors.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed")]
    HashingFailed,
    #[error("password does not match")]
    VerificationFailed,
    #[error("stored hash is not a valid PHC string")]
    InvalidHashFormat,
}

/// Hash a password with a fresh random salt.
///
/// # Arguments
///
/// * `password` - plaintext password
///
/// # Returns
///
/// PHC-format hash string (salt included)
///
/// # Example
///
/// ```rust,ignore
/// let hash = hash_password("my_secure_password").unwrap();
/// // "$argon2id$v=19$m=19456,t=2,p=1$..."
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| PasswordError::HashingFailed)?;

    Ok(hash.to_string())
}

/// Check a password against a stored PHC hash.
///
/// The comparison inside `argon2` is constant-time.
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| PasswordError::VerificationFailed)
}

/// Whether `hash` was produced by pgcrypto `crypt()` (bcrypt, md5 or
/// extended DES) rather than Argon2.
///
/// Such hashes cannot be verified here; the account needs a password reset
/// so the directory stores a [`hash_password`] result instead.
pub fn is_legacy_crypt_hash(hash: &str) -> bool {
    const PREFIXES: [&str; 5] = ["$2a$", "$2b$", "$2x$", "$2y$", "$1$"];

    PREFIXES.iter().any(|prefix| hash.starts_with(prefix))
        || (hash.starts_with('_') && hash.len() == 20)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("historia-clinica-2024").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("historia-clinica-2024", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(PasswordError::VerificationFailed)
        ));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_hash_format() {
        // pgcrypto bcrypt hashes are not accepted
        let result = verify_password("pw", "$2a$06$abcdefghijklmnopqrstuu");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
        assert!(matches!(
            verify_password("pw", ""),
            Err(PasswordError::InvalidHashFormat)
        ));
    }

    #[test]
    fn test_legacy_crypt_hash_detection() {
        assert!(is_legacy_crypt_hash(
            "$2a$06$Q1QjVdqxsJ3Rd0NlHtmNmuX9B0cV5pAzU0bH6zk7RmVfKjJpUqA5y"
        ));
        assert!(is_legacy_crypt_hash("$1$saltsalt$qjXMvbEw8oaL.CzflDugX/"));
        assert!(is_legacy_crypt_hash("_J9..salt5Fb4Zp4mSik"));

        let argon = hash_password("pw").unwrap();
        assert!(!is_legacy_crypt_hash(&argon));
        assert!(!is_legacy_crypt_hash(""));
    }
}
