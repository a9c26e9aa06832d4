//! SQL DDL for the authentication tables.
//! Plain `VARCHAR`/`BIGINT` columns so the same statements run on MySQL and SQLite.

/// Column widths, enforced in Rust before every write since SQLite ignores
/// `VARCHAR(n)`.
pub const USER_ID_MAX: usize = 15;
pub const USERNAME_MAX: usize = 32;
pub const EMAIL_MAX: usize = 100;
pub const KEY_ID_MAX: usize = 255;
pub const HASHED_PASSWORD_MAX: usize = 255;
pub const SESSION_ID_MAX: usize = 127;

/// Schema with:
/// - `users`: root entity
/// - `user_keys`: login methods, `id` = `provider_id:provider_user_id`
/// - `user_sessions`: epoch-millisecond deadlines
/// - no foreign keys; ownership cascades are done in a transaction by the store
pub const AUTH_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id VARCHAR(15) PRIMARY KEY,
    username VARCHAR(32) NOT NULL,
    email VARCHAR(100) NOT NULL
);

CREATE TABLE IF NOT EXISTS user_keys (
    id VARCHAR(255) PRIMARY KEY NOT NULL,
    user_id VARCHAR(15) NOT NULL,
    hashed_password VARCHAR(255) NULL
);

CREATE TABLE IF NOT EXISTS user_sessions (
    id VARCHAR(127) PRIMARY KEY NOT NULL,
    user_id VARCHAR(15) NOT NULL,
    active_expires BIGINT NOT NULL,
    idle_expires BIGINT NOT NULL
);
"#;
