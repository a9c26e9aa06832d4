use mimalloc::MiMalloc;
use sesame::config::Config;
use sesame::context::AppContext;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        env = ?cfg.basic.env,
        database_host = %cfg.database.display_host(),
        loglevel = %cfg.basic.loglevel,
        active_period_ms = cfg.session.active_period_ms,
        idle_period_ms = cfg.session.idle_period_ms
    );

    let addr = cfg.basic.listen_addr.clone();
    let ctx = AppContext::init(cfg).await?;
    let app = sesame::router::sesame_router(ctx);

    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}
