//! Password hashing and verification.
use crate::config::PasswordConfig;
use crate::error::SesameError;
use scrypt::{
    Params, Scrypt,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

const OUTPUT_LEN: usize = 32;

/// Hash a password into a PHC string (`$scrypt$ln=..,r=..,p=..$salt$hash`).
pub fn hash_password(plain: &str, cfg: &PasswordConfig) -> Result<String, SesameError> {
    let params = Params::new(cfg.log_n, cfg.r, cfg.p, OUTPUT_LEN)
        .map_err(|e| SesameError::PasswordHash(e.to_string()))?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Scrypt
        .hash_password_customized(plain.as_bytes(), None, None, params, &salt)
        .map_err(|e| SesameError::PasswordHash(e.to_string()))?
        .to_string();
    Ok(hash)
}

/// Verify a password against a stored hash. Parameters are read from the hash
/// itself. A malformed hash never verifies.
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Scrypt
        .verify_password(plain.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::HASHED_PASSWORD_MAX;

    fn fast() -> PasswordConfig {
        PasswordConfig {
            log_n: 4,
            r: 8,
            p: 1,
        }
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse", &fast()).unwrap();
        assert!(hash.starts_with("$scrypt$"));
        assert!(hash.len() <= HASHED_PASSWORD_MAX);
        assert!(verify_password(&hash, "correct horse"));
        assert!(!verify_password(&hash, "battery staple"));
    }

    #[test]
    fn salts_differ() {
        let a = hash_password("same", &fast()).unwrap();
        let b = hash_password("same", &fast()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("not-a-phc-string", "anything"));
    }
}
