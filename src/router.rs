use crate::context::AppContext;
use crate::handlers::auth::{login, logout, me, renew, signup};
use axum::{
    Router,
    routing::{get, post},
};

pub fn sesame_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/renew", post(renew))
        .route("/auth/me", get(me))
        .with_state(ctx)
}
