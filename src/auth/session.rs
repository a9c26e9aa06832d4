//! Session expiry arithmetic and validation outcomes.
use crate::config::SessionConfig;
use crate::db::models::{DbSession, DbUser};
use serde::Serialize;

/// How long a new or renewed session stays fresh, then idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub active_period_ms: i64,
    pub idle_period_ms: i64,
}

impl SessionPolicy {
    /// Deadlines for a session created or renewed at `now_ms`:
    /// `(now + active, now + active + idle)`.
    pub fn deadlines(&self, now_ms: i64) -> (i64, i64) {
        let active_expires = now_ms.saturating_add(self.active_period_ms);
        let idle_expires = active_expires.saturating_add(self.idle_period_ms);
        (active_expires, idle_expires)
    }
}

impl From<&SessionConfig> for SessionPolicy {
    fn from(cfg: &SessionConfig) -> Self {
        Self {
            active_period_ms: cfg.active_period_ms,
            idle_period_ms: cfg.idle_period_ms,
        }
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        (&SessionConfig::default()).into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// `now < active_expires`
    Active,
    /// `active_expires <= now < idle_expires`
    Idle,
    /// `now >= idle_expires`
    Dead,
}

impl SessionState {
    pub fn of(session: &DbSession, now_ms: i64) -> Self {
        if now_ms >= session.idle_expires {
            SessionState::Dead
        } else if now_ms >= session.active_expires {
            SessionState::Idle
        } else {
            SessionState::Active
        }
    }
}

/// Public view of a user: exactly the attributes a client may see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAttributes {
    pub username: String,
    pub email: String,
}

/// Project a stored user row onto its public attributes. The id travels
/// separately as the session's `user_id`.
pub fn user_attributes(user: &DbUser) -> UserAttributes {
    UserAttributes {
        username: user.username.clone(),
        email: user.email.clone(),
    }
}

/// A session that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidSession {
    pub session_id: String,
    pub user_id: String,
    pub user: UserAttributes,
    pub active_expires: i64,
    pub idle_expires: i64,
    /// `now < active_expires` at validation time.
    pub fresh: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid(ValidSession),
    /// The idle deadline has passed. The row has been removed.
    Expired,
    /// No such session, or its user no longer exists.
    NotFound,
}

impl Validation {
    pub fn valid(self) -> Option<ValidSession> {
        match self {
            Validation::Valid(session) => Some(session),
            Validation::Expired | Validation::NotFound => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }
}
