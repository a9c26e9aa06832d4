use crate::auth::password;
use crate::auth::session::{
    SessionPolicy, SessionState, UserAttributes, ValidSession, Validation, user_attributes,
};
use crate::auth::token;
use crate::config::{Config, Environment, PasswordConfig};
use crate::db::models::{DbKey, DbSession, DbUser};
use crate::db::schema::SESSION_ID_MAX;
use crate::db::store::AuthStorage;
use crate::error::SesameError;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

/// A user as returned to callers: id plus projected attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub user_id: String,
    #[serde(flatten)]
    pub attributes: UserAttributes,
}

/// A login method without its secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Key {
    pub provider_id: String,
    pub provider_user_id: String,
    pub user_id: String,
    pub password_defined: bool,
}

impl From<DbKey> for Key {
    fn from(k: DbKey) -> Self {
        let (provider_id, provider_user_id) = match k.id.split_once(':') {
            Some((p, u)) => (p.to_string(), u.to_string()),
            None => (k.id.clone(), String::new()),
        };
        Key {
            provider_id,
            provider_user_id,
            user_id: k.user_id,
            password_defined: k.hashed_password.is_some(),
        }
    }
}

/// Input for registering a login method.
#[derive(Debug, Clone)]
pub struct NewKey {
    pub provider_id: String,
    pub provider_user_id: String,
    pub password: Option<String>,
}

/// `provider_id:provider_user_id`. The provider id may not contain `:`.
pub fn key_id(provider_id: &str, provider_user_id: &str) -> Result<String, SesameError> {
    if provider_id.is_empty() || provider_id.contains(':') {
        return Err(SesameError::InvalidKeyId);
    }
    Ok(format!("{provider_id}:{provider_user_id}"))
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Session and credential operations over [`AuthStorage`].
#[derive(Clone)]
pub struct Authenticator {
    storage: AuthStorage,
    policy: SessionPolicy,
    password: PasswordConfig,
    env: Environment,
}

impl Authenticator {
    pub fn new(
        storage: AuthStorage,
        policy: SessionPolicy,
        password: PasswordConfig,
        env: Environment,
    ) -> Self {
        Self {
            storage,
            policy,
            password,
            env,
        }
    }

    pub fn from_config(storage: AuthStorage, cfg: &Config) -> Self {
        Self::new(
            storage,
            SessionPolicy::from(&cfg.session),
            cfg.password.clone(),
            cfg.basic.env,
        )
    }

    pub fn env(&self) -> Environment {
        self.env
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    // ---- users ----

    /// Register a user with a generated id and, optionally, its first key.
    pub async fn create_user(
        &self,
        attributes: UserAttributes,
        key: Option<NewKey>,
    ) -> Result<AuthUser, SesameError> {
        let user = DbUser {
            id: token::generate_user_id(),
            username: attributes.username,
            email: attributes.email,
        };
        user.check()?;

        let key = match key {
            Some(k) => Some(self.build_key(&user.id, k).await?),
            None => None,
        };
        if let Some(key) = key.as_ref()
            && self.storage.get_key(&key.id).await?.is_some()
        {
            return Err(SesameError::DuplicateKeyId);
        }
        self.storage.insert_user(&user, key.as_ref()).await?;

        info!(user_id = %user.id, with_key = key.is_some(), "user created");
        Ok(AuthUser {
            attributes: user_attributes(&user),
            user_id: user.id,
        })
    }

    pub async fn get_user(&self, user_id: &str) -> Result<AuthUser, SesameError> {
        let user = self
            .storage
            .get_user(user_id)
            .await?
            .ok_or(SesameError::UserNotFound)?;
        Ok(AuthUser {
            attributes: user_attributes(&user),
            user_id: user.id,
        })
    }

    /// Remove a user with all of its keys and sessions. Missing users are
    /// not an error.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), SesameError> {
        let existed = self.storage.delete_user(user_id).await?;
        info!(user_id, existed, "user deleted");
        Ok(())
    }

    // ---- keys ----

    async fn build_key(&self, user_id: &str, key: NewKey) -> Result<DbKey, SesameError> {
        let id = key_id(&key.provider_id, &key.provider_user_id)?;
        let hashed_password = match key.password {
            Some(plain) => Some(self.hash(plain).await?),
            None => None,
        };
        let key = DbKey {
            id,
            user_id: user_id.to_string(),
            hashed_password,
        };
        key.check()?;
        Ok(key)
    }

    pub async fn create_key(&self, user_id: &str, key: NewKey) -> Result<Key, SesameError> {
        if self.storage.get_user(user_id).await?.is_none() {
            return Err(SesameError::UserNotFound);
        }
        let key = self.build_key(user_id, key).await?;
        if self.storage.get_key(&key.id).await?.is_some() {
            return Err(SesameError::DuplicateKeyId);
        }
        self.storage.insert_key(&key).await?;
        debug!(user_id, provider = %key.id.split(':').next().unwrap_or(""), "key created");
        Ok(key.into())
    }

    pub async fn get_key(
        &self,
        provider_id: &str,
        provider_user_id: &str,
    ) -> Result<Key, SesameError> {
        let id = key_id(provider_id, provider_user_id)?;
        let key = self
            .storage
            .get_key(&id)
            .await?
            .ok_or(SesameError::InvalidKeyId)?;
        Ok(key.into())
    }

    pub async fn user_keys(&self, user_id: &str) -> Result<Vec<Key>, SesameError> {
        if self.storage.get_user(user_id).await?.is_none() {
            return Err(SesameError::UserNotFound);
        }
        let keys = self.storage.keys_of_user(user_id).await?;
        Ok(keys.into_iter().map(Key::from).collect())
    }

    /// Authenticate with a key. A key that stores a hash requires a matching
    /// password; a key without one rejects any password.
    pub async fn use_key(
        &self,
        provider_id: &str,
        provider_user_id: &str,
        password: Option<&str>,
    ) -> Result<Key, SesameError> {
        let id = key_id(provider_id, provider_user_id)?;
        let key = self
            .storage
            .get_key(&id)
            .await?
            .ok_or(SesameError::InvalidKeyId)?;

        match (key.hashed_password.as_deref(), password) {
            (None, None) => {}
            (Some(hash), Some(plain)) => {
                if !self.verify(hash.to_string(), plain.to_string()).await? {
                    debug!(user_id = %key.user_id, "password mismatch");
                    return Err(SesameError::InvalidPassword);
                }
            }
            (None, Some(_)) | (Some(_), None) => return Err(SesameError::InvalidPassword),
        }
        Ok(key.into())
    }

    /// Set, rotate or clear (`None`) the password of a key.
    pub async fn update_key_password(
        &self,
        provider_id: &str,
        provider_user_id: &str,
        password: Option<&str>,
    ) -> Result<Key, SesameError> {
        let id = key_id(provider_id, provider_user_id)?;
        let hashed = match password {
            Some(plain) => Some(self.hash(plain.to_string()).await?),
            None => None,
        };
        if !self
            .storage
            .update_key_password(&id, hashed.as_deref())
            .await?
        {
            return Err(SesameError::InvalidKeyId);
        }
        let key = self
            .storage
            .get_key(&id)
            .await?
            .ok_or(SesameError::InvalidKeyId)?;
        info!(user_id = %key.user_id, "key password updated");
        Ok(key.into())
    }

    /// Revoke a login method. Idempotent.
    pub async fn delete_key(
        &self,
        provider_id: &str,
        provider_user_id: &str,
    ) -> Result<(), SesameError> {
        let id = key_id(provider_id, provider_user_id)?;
        self.storage.delete_key(&id).await?;
        Ok(())
    }

    // ---- sessions ----

    pub async fn create_session(&self, user_id: &str) -> Result<DbSession, SesameError> {
        self.create_session_at(user_id, now_ms()).await
    }

    pub async fn create_session_at(
        &self,
        user_id: &str,
        now_ms: i64,
    ) -> Result<DbSession, SesameError> {
        if self.storage.get_user(user_id).await?.is_none() {
            return Err(SesameError::UserNotFound);
        }
        let (active_expires, idle_expires) = self.policy.deadlines(now_ms);
        let session = DbSession {
            id: token::generate_session_id(),
            user_id: user_id.to_string(),
            active_expires,
            idle_expires,
        };
        self.storage.insert_session(&session).await?;
        debug!(user_id, active_expires, idle_expires, "session created");
        Ok(session)
    }

    pub async fn validate_session(&self, session_id: &str) -> Result<Validation, SesameError> {
        self.validate_session_at(session_id, now_ms()).await
    }

    /// Dead sessions and sessions of deleted users are removed as they are
    /// found.
    pub async fn validate_session_at(
        &self,
        session_id: &str,
        now_ms: i64,
    ) -> Result<Validation, SesameError> {
        if session_id.is_empty() || session_id.len() > SESSION_ID_MAX {
            return Ok(Validation::NotFound);
        }
        let Some(session) = self.storage.get_session(session_id).await? else {
            return Ok(Validation::NotFound);
        };

        let state = SessionState::of(&session, now_ms);
        if state == SessionState::Dead {
            self.storage.delete_session(&session.id).await?;
            debug!(user_id = %session.user_id, "expired session removed");
            return Ok(Validation::Expired);
        }

        let Some(user) = self.storage.get_user(&session.user_id).await? else {
            self.storage.delete_session(&session.id).await?;
            warn!(user_id = %session.user_id, "orphan session removed");
            return Ok(Validation::NotFound);
        };

        Ok(Validation::Valid(ValidSession {
            session_id: session.id,
            user_id: session.user_id,
            user: user_attributes(&user),
            active_expires: session.active_expires,
            idle_expires: session.idle_expires,
            fresh: state == SessionState::Active,
        }))
    }

    pub async fn renew_session(&self, session_id: &str) -> Result<DbSession, SesameError> {
        self.renew_session_at(session_id, now_ms()).await
    }

    /// Push both deadlines forward from `now_ms`, keeping the id.
    pub async fn renew_session_at(
        &self,
        session_id: &str,
        now_ms: i64,
    ) -> Result<DbSession, SesameError> {
        let mut session = self
            .storage
            .get_session(session_id)
            .await?
            .ok_or(SesameError::SessionNotFound)?;

        if SessionState::of(&session, now_ms) == SessionState::Dead {
            self.storage.delete_session(&session.id).await?;
            return Err(SesameError::SessionExpired);
        }
        if self.storage.get_user(&session.user_id).await?.is_none() {
            self.storage.delete_session(&session.id).await?;
            warn!(user_id = %session.user_id, "orphan session removed");
            return Err(SesameError::SessionNotFound);
        }

        let (active_expires, idle_expires) = self.policy.deadlines(now_ms);
        if !self
            .storage
            .update_session_expiry(&session.id, active_expires, idle_expires)
            .await?
        {
            return Err(SesameError::SessionNotFound);
        }
        session.active_expires = active_expires;
        session.idle_expires = idle_expires;
        debug!(user_id = %session.user_id, idle_expires, "session renewed");
        Ok(session)
    }

    /// Delete a session. Destroying an absent session is not an error.
    pub async fn destroy_session(&self, session_id: &str) -> Result<(), SesameError> {
        let existed = self.storage.delete_session(session_id).await?;
        debug!(existed, "session destroyed");
        Ok(())
    }

    pub async fn user_sessions(&self, user_id: &str) -> Result<Vec<DbSession>, SesameError> {
        self.user_sessions_at(user_id, now_ms()).await
    }

    /// Sessions of a user that are not yet dead at `now_ms`.
    pub async fn user_sessions_at(
        &self,
        user_id: &str,
        now_ms: i64,
    ) -> Result<Vec<DbSession>, SesameError> {
        if self.storage.get_user(user_id).await?.is_none() {
            return Err(SesameError::UserNotFound);
        }
        let sessions = self.storage.sessions_of_user(user_id).await?;
        Ok(sessions
            .into_iter()
            .filter(|s| SessionState::of(s, now_ms) != SessionState::Dead)
            .collect())
    }

    /// Sign a user out everywhere. Returns the number of sessions removed.
    pub async fn destroy_user_sessions(&self, user_id: &str) -> Result<u64, SesameError> {
        let removed = self.storage.delete_sessions_of_user(user_id).await?;
        info!(user_id, removed, "all user sessions destroyed");
        Ok(removed)
    }

    pub async fn delete_dead_user_sessions(&self, user_id: &str) -> Result<u64, SesameError> {
        self.delete_dead_user_sessions_at(user_id, now_ms()).await
    }

    pub async fn delete_dead_user_sessions_at(
        &self,
        user_id: &str,
        now_ms: i64,
    ) -> Result<u64, SesameError> {
        let removed = self
            .storage
            .delete_dead_sessions_of_user(user_id, now_ms)
            .await?;
        debug!(user_id, removed, "dead sessions swept");
        Ok(removed)
    }

    // ---- hashing on the blocking pool ----

    async fn hash(&self, plain: String) -> Result<String, SesameError> {
        let cfg = self.password.clone();
        tokio::task::spawn_blocking(move || password::hash_password(&plain, &cfg))
            .await
            .map_err(|e| SesameError::Internal(format!("password hash task failed: {e}")))?
    }

    async fn verify(&self, hash: String, plain: String) -> Result<bool, SesameError> {
        tokio::task::spawn_blocking(move || password::verify_password(&hash, &plain))
            .await
            .map_err(|e| SesameError::Internal(format!("password verify task failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ids_join_provider_and_user() {
        assert_eq!(key_id("username", "alice").unwrap(), "username:alice");
        assert!(matches!(
            key_id("user:name", "alice"),
            Err(SesameError::InvalidKeyId)
        ));
        assert!(matches!(key_id("", "alice"), Err(SesameError::InvalidKeyId)));
    }

    #[test]
    fn key_view_hides_hash() {
        let key: Key = DbKey {
            id: "email:a@x.com".into(),
            user_id: "u1".into(),
            hashed_password: Some("$scrypt$secret".into()),
        }
        .into();
        assert_eq!(key.provider_id, "email");
        assert_eq!(key.provider_user_id, "a@x.com");
        assert!(key.password_defined);

        let json = serde_json::to_string(&key).unwrap();
        assert!(!json.contains("scrypt"));
    }
}
