//! Wardbell gateway binary.
//!
//! Usage: `wardbell-gateway [config.yaml]` (default `wardbell.yaml`).
//! Log filtering via `RUST_LOG`.

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use wardbell_core::error::{Result, WardbellError};
use wardbell_gateway::{app_state, config, router};

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "wardbell.yaml".to_string());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg
        .gateway
        .listen
        .parse()
        .map_err(|e| WardbellError::BadRequest(format!("gateway.listen must be a valid SocketAddr: {e}")))?;

    let state = app_state::AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, config = %path, "wardbell-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| WardbellError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| WardbellError::Internal(format!("server failed: {e}")))?;

    tracing::info!("wardbell-gateway stopped");
    Ok(())
}

async fn shutdown_signal(state: app_state::AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler failed");
        return;
    }
    state.set_draining();
    tracing::info!(connections = state.registry().stats().total(), "draining");
}
