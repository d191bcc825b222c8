//! Relay server configuration

use std::net::{Ipv4Addr, SocketAddr};

/// Default port the relay listens on
pub const DEFAULT_PORT: u16 = 5000;

/// Path the WebSocket upgrade is served on
pub const DEFAULT_WS_PATH: &str = "/ws";

/// Configuration for a relay server
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to bind the TCP listener to
    pub listen: SocketAddr,
    /// Only upgrade requests for this path are accepted
    pub path: String,
}

impl RelayConfig {
    pub fn new(listen: SocketAddr) -> Self {
        Self {
            listen,
            ..Self::default()
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            path: DEFAULT_WS_PATH.to_string(),
        }
    }
}
