use async_trait::async_trait;
use classcast_core::IceServerConfig;
use classcast_core::utils::default_ice_servers;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const ICE_SERVERS_ENV: &str = "CLASSCAST_ICE_SERVERS";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub want_audio: bool,
    pub want_video: bool,
    /// How long a muted remote screen track may stay silent before it is
    /// treated as stopped.
    pub mute_grace_ms: u64,
    /// Empty means the public STUN fallback.
    pub ice_servers: Vec<IceServerConfig>,
    pub peer_inbox_capacity: usize,
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            want_audio: true,
            want_video: true,
            mute_grace_ms: 1500,
            ice_servers: Vec::new(),
            peer_inbox_capacity: 64,
            event_capacity: 256,
        }
    }
}

impl SessionConfig {
    pub fn mute_grace(&self) -> Duration {
        Duration::from_millis(self.mute_grace_ms)
    }
}

#[derive(Debug, Error)]
pub enum IceSourceError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("malformed ICE server list: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Supplies STUN/TURN endpoints at session start.
#[async_trait]
pub trait IceServerSource: Send + Sync {
    async fn ice_servers(&self) -> Result<Vec<IceServerConfig>, IceSourceError>;
}

pub struct StaticIceServers(pub Vec<IceServerConfig>);

#[async_trait]
impl IceServerSource for StaticIceServers {
    async fn ice_servers(&self) -> Result<Vec<IceServerConfig>, IceSourceError> {
        Ok(self.0.clone())
    }
}

/// Reads a JSON list of `IceServerConfig` from `CLASSCAST_ICE_SERVERS`.
pub struct EnvIceServers;

#[async_trait]
impl IceServerSource for EnvIceServers {
    async fn ice_servers(&self) -> Result<Vec<IceServerConfig>, IceSourceError> {
        let raw =
            std::env::var(ICE_SERVERS_ENV).map_err(|_| IceSourceError::Missing(ICE_SERVERS_ENV))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Asks the source for servers, falling back to public STUN when it fails
/// or has nothing to offer.
pub async fn resolve_ice_servers(source: &dyn IceServerSource) -> Vec<IceServerConfig> {
    match source.ice_servers().await {
        Ok(servers) if !servers.is_empty() => {
            info!("Using {} configured ICE server entries", servers.len());
            servers
        }
        Ok(_) => {
            info!("ICE server source returned no entries, using public STUN");
            default_ice_servers()
        }
        Err(e) => {
            warn!("ICE server source unavailable ({}), using public STUN", e);
            default_ice_servers()
        }
    }
}
