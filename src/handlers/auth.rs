use crate::auth::{NewKey, UserAttributes, ValidSession};
use crate::context::AppContext;
use crate::db::DbSession;
use crate::error::SesameError;
use crate::middleware::auth::{
    AuthSession, clear_session_cookie, session_cookie, session_token,
};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Provider id of the username/password login method.
pub const USERNAME_PROVIDER: &str = "username";

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: String,
    #[serde(flatten)]
    pub user: UserAttributes,
    pub fresh: bool,
    pub idle_expires: i64,
}

impl From<ValidSession> for SessionResponse {
    fn from(s: ValidSession) -> Self {
        Self {
            user_id: s.user_id,
            user: s.user,
            fresh: s.fresh,
            idle_expires: s.idle_expires,
        }
    }
}

fn session_response(session: &DbSession, user: UserAttributes, fresh: bool) -> SessionResponse {
    SessionResponse {
        user_id: session.user_id.clone(),
        user,
        fresh,
        idle_expires: session.idle_expires,
    }
}

/// POST /auth/signup -> creates the user with a username key and signs it in.
pub async fn signup(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, SesameError> {
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(SesameError::InvalidInput("username must not be empty"));
    }
    let email = req.email.trim().to_string();
    if email.is_empty() {
        return Err(SesameError::InvalidInput("email must not be empty"));
    }
    if req.password.is_empty() {
        return Err(SesameError::InvalidInput("password must not be empty"));
    }

    let attributes = UserAttributes {
        username: username.clone(),
        email,
    };
    let key = NewKey {
        provider_id: USERNAME_PROVIDER.to_string(),
        provider_user_id: username.to_lowercase(),
        password: Some(req.password),
    };
    let user = ctx.auth.create_user(attributes, Some(key)).await?;
    let session = ctx.auth.create_session(&user.user_id).await?;

    let jar = jar.add(session_cookie(
        &ctx.config.session.cookie_name,
        &session,
        ctx.auth.env(),
    ));
    info!(user_id = %user.user_id, "signup completed");
    Ok((
        StatusCode::CREATED,
        jar,
        Json(session_response(&session, user.attributes, true)),
    ))
}

/// POST /auth/login -> verifies the password and opens a new session.
pub async fn login(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, SesameError> {
    let key = ctx
        .auth
        .use_key(
            USERNAME_PROVIDER,
            &req.username.trim().to_lowercase(),
            Some(&req.password),
        )
        .await?;
    let user = ctx.auth.get_user(&key.user_id).await?;
    let session = ctx.auth.create_session(&user.user_id).await?;

    let jar = jar.add(session_cookie(
        &ctx.config.session.cookie_name,
        &session,
        ctx.auth.env(),
    ));
    info!(user_id = %user.user_id, "login succeeded");
    Ok((jar, Json(session_response(&session, user.attributes, true))))
}

/// POST /auth/logout -> destroys whatever session the request carries and
/// clears the cookie. Stale or unknown tokens still get the cookie cleared;
/// a request without any token is a no-op.
pub async fn logout(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, SesameError> {
    if let Some(token) = session_token(&headers, &ctx.config.session.cookie_name) {
        ctx.auth.destroy_session(&token).await?;
    }
    let jar = jar.remove(clear_session_cookie(
        &ctx.config.session.cookie_name,
        ctx.auth.env(),
    ));
    Ok((StatusCode::NO_CONTENT, jar))
}

/// POST /auth/renew -> pushes both deadlines of the current session forward.
pub async fn renew(
    State(ctx): State<AppContext>,
    AuthSession(current): AuthSession,
    jar: CookieJar,
) -> Result<impl IntoResponse, SesameError> {
    let session = ctx.auth.renew_session(&current.session_id).await?;
    let jar = jar.add(session_cookie(
        &ctx.config.session.cookie_name,
        &session,
        ctx.auth.env(),
    ));
    Ok((jar, Json(session_response(&session, current.user, true))))
}

/// GET /auth/me -> the authenticated principal.
pub async fn me(AuthSession(session): AuthSession) -> Json<SessionResponse> {
    Json(session.into())
}
