use crate::auth::Authenticator;
use crate::config::Config;
use crate::db::Database;
use crate::error::SesameError;
use std::sync::Arc;
use tracing::info;

/// Everything a request handler needs, built once at startup and cloned
/// into each request. All members are shared handles.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub db: Database,
    pub auth: Authenticator,
}

impl AppContext {
    /// Connect to the store, create the tables if needed and wire the
    /// authenticator.
    pub async fn init(config: Config) -> Result<Self, SesameError> {
        let url = config.database.connect_url(config.basic.env)?;
        let db = Database::connect(&url, config.database.max_connections).await?;
        db.init_schema().await?;
        info!(
            host = %config.database.display_host(),
            env = ?config.basic.env,
            "database connected and schema ready"
        );
        Ok(Self::new(config, db))
    }

    pub fn new(config: Config, db: Database) -> Self {
        let auth = Authenticator::from_config(db.storage(), &config);
        Self {
            config: Arc::new(config),
            db,
            auth,
        }
    }
}
