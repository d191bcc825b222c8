//! Lobby Relay: rendezvous and signaling for peer-to-peer sessions
//!
//! Peers publish lobbies over a WebSocket, discover other peers' lobbies
//! annotated with great-circle distance, and hand a signaling payload
//! (e.g. a WebRTC offer) to a lobby's creator through the relay. The
//! payload is never inspected.
//!
//! # Example
//!
//! ```ignore
//! use lobby_relay::config::RelayConfig;
//! use lobby_relay::relay::{Lobby, RelayClient, RelayServer};
//!
//! let server = RelayServer::bind(&RelayConfig::new("127.0.0.1:0".parse()?)).await?;
//! let url = server.url()?;
//! tokio::spawn(server.run());
//!
//! let host = RelayClient::connect(&url).await?;
//! host.new_lobby(&Lobby { id: "1".into(), name: "Duck".into(), ..Lobby::default() }).await?;
//! ```

pub mod config;
pub mod error;
pub mod geo;
pub mod relay;

// Re-export commonly used types
pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use geo::Location;
pub use relay::{
    ConnectLobbyRequest, ConnectLobbyResponse, ListLobbyRequest, Lobby, LobbyRegistry,
    RelayClient, RelayServer,
};
