use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hashing failed");
            anyhow::anyhow!(e.to_string())
        })
}

/// `Ok(false)` means the password does not match. Anything else wrong with
/// the stored hash surfaces as an error instead of a silent rejection.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "stored password hash is malformed");
        anyhow::anyhow!(e.to_string())
    })?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => {
            error!(error = %e, "argon2 verification failed");
            Err(anyhow::anyhow!(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_accepts_the_original_password() {
        let hash = hash_password("notebook-login-9").expect("hash");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("notebook-login-9", &hash).expect("verify"));
    }

    #[test]
    fn wrong_password_is_a_clean_mismatch() {
        let hash = hash_password("first-choice").expect("hash");
        assert!(!verify_password("second-guess", &hash).expect("verify"));
    }

    #[test]
    fn malformed_stored_hash_is_an_error_not_a_mismatch() {
        assert!(verify_password("anything", "plaintext-left-by-a-bug").is_err());
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same-password").expect("hash");
        let b = hash_password("same-password").expect("hash");
        assert_ne!(a, b);
    }
}
