use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use todo_service::{
    config::AppConfig,
    create_app, db,
    services::{AuthService, TaskService},
    storage::{SqliteTaskStore, SqliteUserStore},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging first so config problems are reported
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,todo_service=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    let pool = db::establish_connection(&config.database_url)
        .await
        .with_context(|| format!("connecting to {}", config.database_url))?;

    let state = AppState {
        tasks: TaskService::new(Arc::new(SqliteTaskStore::new(pool.clone()))),
        auth: AuthService::new(
            Arc::new(SqliteUserStore::new(pool.clone())),
            config.auth.clone(),
        ),
    };
    let app = create_app(state, &config.cors_allow_origin);

    let addr = config.bind_addr();
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
