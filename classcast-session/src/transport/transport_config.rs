use classcast_core::IceServerConfig;
use classcast_core::utils::default_ice_servers;

/// ICE configuration handed to every transport created by a session.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl TransportConfig {
    /// Uses the given servers, or the public STUN set when none are given.
    pub fn from_servers(ice_servers: Vec<IceServerConfig>) -> Self {
        if ice_servers.is_empty() {
            Self::default()
        } else {
            Self { ice_servers }
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
        }
    }
}
