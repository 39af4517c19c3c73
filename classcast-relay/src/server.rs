use crate::{RelayService, ws_handler};
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use classcast_core::IceServerConfig;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

pub fn router(service: RelayService) -> Router {
    Router::new()
        .route("/session/{session}/ws/{participant}", get(ws_handler))
        .with_state(service)
}

/// Binds `addr` and serves the relay until the process ends.
pub async fn serve(addr: SocketAddr, ice_servers: Vec<IceServerConfig>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind relay to {}", addr))?;
    serve_on(listener, RelayService::new(ice_servers)).await
}

pub async fn serve_on(listener: TcpListener, service: RelayService) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no address")?;
    info!("Signaling relay listening on ws://{}", addr);
    axum::serve(listener, router(service))
        .await
        .context("Relay server stopped")
}
