// src/main.rs

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use erp_backend::{
    config::{AppState, Config},
    routes::create_router,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;
    let server_addr = config.server_addr.clone();

    let app_state = AppState::new(config)
        .await
        .context("failed to initialise application state")?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("failed to run database migrations")?;
    tracing::info!("✅ Database migrations applied");

    tokio::fs::create_dir_all(&app_state.config.upload_dir)
        .await
        .with_context(|| format!("cannot create {}", app_state.config.upload_dir.display()))?;

    let app = create_router(app_state);

    let listener = TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("cannot bind {}", server_addr))?;
    tracing::info!("🚀 Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
