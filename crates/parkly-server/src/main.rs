mod config;
mod seed;

use std::sync::Arc;

use tracing::{info, warn};

use parkly_api::{AppState, AppStateInner, build_router};
use parkly_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parkly=debug,parkly_api=debug,parkly_db=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.uses_dev_secret() {
        warn!("PARKLY_JWT_SECRET not set, using the development secret");
    }

    // Init database
    let db = Database::open(&config.db_path)?;
    seed::run(&db, &config)?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
    });
    let app = build_router(state);

    let addr = config.addr()?;
    info!("Parkly server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
