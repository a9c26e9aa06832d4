//! Session authentication: identifiers, password hashing, expiry rules and
//! the [`Authenticator`] that ties them to the database.

pub mod authenticator;
pub mod password;
pub mod session;
pub mod token;

pub use authenticator::{AuthUser, Authenticator, Key, NewKey};
pub use session::{SessionPolicy, SessionState, UserAttributes, ValidSession, Validation};
