use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum SesameError {
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Field `{field}` exceeds {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid key id")]
    InvalidKeyId,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Key id already exists")]
    DuplicateKeyId,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session expired")]
    SessionExpired,

    #[error("Password hash error: {0}")]
    PasswordHash(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SesameError {
    /// True for failures that mean "the caller is not authenticated" rather
    /// than "the service is broken".
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            SesameError::UserNotFound
                | SesameError::InvalidKeyId
                | SesameError::InvalidPassword
                | SesameError::SessionNotFound
                | SesameError::SessionExpired
        )
    }
}

impl IntoResponse for SesameError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            SesameError::DatabaseError(_)
            | SesameError::PasswordHash(_)
            | SesameError::Internal(_)
            | SesameError::Config(_)
            | SesameError::MissingConfig(_)
            | SesameError::InvalidConfig(_)
            | SesameError::UrlParse(_) => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                };
                (status, body)
            }
            SesameError::UserNotFound
            | SesameError::InvalidKeyId
            | SesameError::InvalidPassword
            | SesameError::SessionNotFound
            | SesameError::SessionExpired => {
                let status = StatusCode::UNAUTHORIZED;
                let body = ApiErrorBody {
                    code: "UNAUTHORIZED".to_string(),
                    message: "Authentication error.".to_string(),
                };
                (status, body)
            }
            SesameError::DuplicateKeyId => {
                let status = StatusCode::CONFLICT;
                let body = ApiErrorBody {
                    code: "DUPLICATE_KEY".to_string(),
                    message: "An account with this login already exists.".to_string(),
                };
                (status, body)
            }
            err @ (SesameError::FieldTooLong { .. } | SesameError::InvalidInput(_)) => {
                let status = StatusCode::BAD_REQUEST;
                let body = ApiErrorBody {
                    code: "INVALID_INPUT".to_string(),
                    message: err.to_string(),
                };
                (status, body)
            }
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referential_errors_map_to_unauthorized() {
        for err in [
            SesameError::UserNotFound,
            SesameError::InvalidKeyId,
            SesameError::InvalidPassword,
            SesameError::SessionNotFound,
            SesameError::SessionExpired,
        ] {
            assert!(err.is_unauthenticated());
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn storage_errors_are_internal() {
        let err = SesameError::DatabaseError(SqlxError::PoolTimedOut);
        assert!(!err.is_unauthenticated());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn input_errors_map_to_client_statuses() {
        let too_long = SesameError::FieldTooLong {
            field: "username",
            max: 32,
        };
        assert_eq!(too_long.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            SesameError::DuplicateKeyId.into_response().status(),
            StatusCode::CONFLICT
        );
    }
}
