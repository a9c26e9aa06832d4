use crate::db::schema::{
    EMAIL_MAX, HASHED_PASSWORD_MAX, KEY_ID_MAX, SESSION_ID_MAX, USER_ID_MAX, USERNAME_MAX,
};
use crate::error::SesameError;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbUser {
    pub id: String,
    pub username: String,
    pub email: String,
}

/// A stored login method. Deliberately not `Serialize`: the hash must not
/// leave the process.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DbKey {
    pub id: String,
    pub user_id: String,
    pub hashed_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct DbSession {
    pub id: String,
    pub user_id: String,
    pub active_expires: i64,
    pub idle_expires: i64,
}

impl DbUser {
    pub fn check(&self) -> Result<(), SesameError> {
        check_len("id", &self.id, USER_ID_MAX)?;
        check_len("username", &self.username, USERNAME_MAX)?;
        check_len("email", &self.email, EMAIL_MAX)
    }
}

impl DbKey {
    pub fn check(&self) -> Result<(), SesameError> {
        check_len("key_id", &self.id, KEY_ID_MAX)?;
        check_len("user_id", &self.user_id, USER_ID_MAX)?;
        if let Some(hash) = self.hashed_password.as_deref() {
            check_len("hashed_password", hash, HASHED_PASSWORD_MAX)?;
        }
        Ok(())
    }
}

impl DbSession {
    pub fn check(&self) -> Result<(), SesameError> {
        check_len("session_id", &self.id, SESSION_ID_MAX)?;
        check_len("user_id", &self.user_id, USER_ID_MAX)
    }
}

/// Widths are declared in characters, as `VARCHAR(n)` counts them.
pub fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), SesameError> {
    if value.chars().count() > max {
        return Err(SesameError::FieldTooLong { field, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_widths_follow_schema() {
        let mut user = DbUser {
            id: "u1".into(),
            username: "a".repeat(USERNAME_MAX),
            email: "a@x.com".into(),
        };
        assert!(user.check().is_ok());

        user.username.push('a');
        assert!(matches!(
            user.check(),
            Err(SesameError::FieldTooLong {
                field: "username",
                max: 32
            })
        ));
    }

    #[test]
    fn widths_count_characters_not_bytes() {
        let name = "é".repeat(USERNAME_MAX);
        assert!(name.len() > USERNAME_MAX);
        assert!(check_len("username", &name, USERNAME_MAX).is_ok());
    }

    #[test]
    fn null_hash_is_allowed() {
        let key = DbKey {
            id: "github:42".into(),
            user_id: "u1".into(),
            hashed_password: None,
        };
        assert!(key.check().is_ok());
    }
}
