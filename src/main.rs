use pkl_hub::{router, AppState, Config, LocalStore};
use std::net::SocketAddr;
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    if let Some(parent) = config.data_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let store = LocalStore::open(config.data_path.clone()).await;
    info!(path = %store.path().display(), keys = store.items().len(), "storage loaded");

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(config, store);
    let poller = state.dashboard.clone().spawn_poller(
        state.sessions().clone(),
        state.config.counter_wrap_limit,
        state.config.poll_interval,
    );

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    poller.abort();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
