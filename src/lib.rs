pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use auth::Authenticator;
pub use context::AppContext;
pub use error::SesameError;
