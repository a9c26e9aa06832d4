//! Random identifiers for users and sessions.
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, RngCore, rngs::OsRng};

/// 32 bytes = 256 bits of entropy, 43 characters once encoded.
const SESSION_TOKEN_BYTES: usize = 32;

const USER_ID_LENGTH: usize = 15;
const USER_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a session id from OS entropy, base64 URL-safe without padding.
pub fn generate_session_id() -> String {
    let mut buffer = [0u8; SESSION_TOKEN_BYTES];
    OsRng.fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}

/// Generate a 15-character lowercase alphanumeric user id, the width of
/// `users.id`.
pub fn generate_user_id() -> String {
    (0..USER_ID_LENGTH)
        .map(|_| USER_ID_ALPHABET[OsRng.gen_range(0..USER_ID_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::{SESSION_ID_MAX, USER_ID_MAX};

    #[test]
    fn session_ids_are_unique_and_fit_column() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.len() <= SESSION_ID_MAX);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn user_ids_use_full_column_width() {
        let id = generate_user_id();
        assert_eq!(id.len(), USER_ID_MAX);
        assert!(
            id.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
        assert_ne!(id, generate_user_id());
    }
}
