#![allow(dead_code)]

use sesame::config::{Config, PasswordConfig, SessionConfig};
use sesame::db::Database;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

pub const ACTIVE_MS: i64 = 900_000;
pub const IDLE_MS: i64 = 85_500_000;

/// Fresh SQLite file per test, removed by the caller.
pub async fn temp_db(tag: &str) -> (Database, PathBuf) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!(
        "sesame-{tag}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));

    let database_url = format!("sqlite:{}?mode=rwc", temp_path.display());
    let db = Database::connect(&database_url, 1)
        .await
        .expect("failed to open sqlite database");
    db.init_schema().await.expect("failed to create schema");
    (db, temp_path)
}

/// 15 minute active window, 24 hour idle deadline, cheap scrypt.
pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.session = SessionConfig {
        active_period_ms: ACTIVE_MS,
        idle_period_ms: IDLE_MS,
        ..SessionConfig::default()
    };
    cfg.password = PasswordConfig {
        log_n: 4,
        r: 8,
        p: 1,
    };
    cfg
}
