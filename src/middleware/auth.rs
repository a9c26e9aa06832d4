use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use headers::{Authorization, HeaderMapExt, authorization::Bearer};
use serde_json::json;
use time::OffsetDateTime;

use crate::auth::{ValidSession, Validation};
use crate::config::Environment;
use crate::context::AppContext;
use crate::db::DbSession;

/// Read the session token from the request.
/// Accepts either:
/// - Cookie: `<cookie_name>=...`
/// - Header: `Authorization: Bearer ...`
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    // 1) cookie
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(cookie_name)
        && !cookie.value().is_empty()
    {
        return Some(cookie.value().to_string());
    }

    // 2) header: Authorization: Bearer <id>
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
        .filter(|t| !t.is_empty())
}

/// A request carrying a live session. Rejects with 401 otherwise.
#[derive(Debug, Clone)]
pub struct AuthSession(pub ValidSession);

impl FromRequestParts<AppContext> for AuthSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers, &ctx.config.session.cookie_name) else {
            return Err(unauthorized("missing session"));
        };
        match ctx.auth.validate_session(&token).await {
            Ok(Validation::Valid(session)) => Ok(Self(session)),
            Ok(Validation::Expired) => Err(unauthorized("session expired")),
            Ok(Validation::NotFound) => Err(unauthorized("invalid session")),
            Err(e) => Err(e.into_response()),
        }
    }
}

fn unauthorized(reason: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "unauthorized", "reason": reason})),
    )
        .into_response()
}

/// Session cookie expiring with the idle deadline. `Secure` only in
/// production so local HTTP development keeps working.
pub fn session_cookie(name: &str, session: &DbSession, env: Environment) -> Cookie<'static> {
    let mut builder = Cookie::build(Cookie::new(name.to_string(), session.id.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(env.is_production());
    if let Ok(at) = OffsetDateTime::from_unix_timestamp(session.idle_expires / 1000) {
        builder = builder.expires(at);
    }
    builder.build()
}

pub fn clear_session_cookie(name: &str, env: Environment) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(env.is_production())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn session() -> DbSession {
        DbSession {
            id: "tok".into(),
            user_id: "u1".into(),
            active_expires: 1_700_000_000_000,
            idle_expires: 1_700_086_400_000,
        }
    }

    #[test]
    fn cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("auth_session=from-cookie"));
        headers.insert(
            "authorization",
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(
            session_token(&headers, "auth_session").as_deref(),
            Some("from-cookie")
        );
    }

    #[test]
    fn bearer_is_a_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(
            session_token(&headers, "auth_session").as_deref(),
            Some("from-header")
        );
        assert_eq!(session_token(&HeaderMap::new(), "auth_session"), None);
    }

    #[test]
    fn secure_flag_tracks_environment() {
        let dev = session_cookie("auth_session", &session(), Environment::Development);
        assert_eq!(dev.secure(), Some(false));
        assert_eq!(dev.http_only(), Some(true));
        assert_eq!(dev.path(), Some("/"));

        let prod = session_cookie("auth_session", &session(), Environment::Production);
        assert_eq!(prod.secure(), Some(true));
        assert_eq!(
            prod.expires_datetime().map(|t| t.unix_timestamp()),
            Some(1_700_086_400)
        );
    }
}
