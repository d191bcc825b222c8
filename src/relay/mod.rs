//! Lobby Relay
//!
//! A WebSocket rendezvous point for peer-to-peer session setup. Peers
//! advertise lobbies, discover each other's lobbies by proximity, and
//! exchange an opaque signaling payload with a lobby's creator through
//! the relay.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         LOBBY RELAY (lobby-relay)                    │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                      │
//! │  ┌──────────────────────────────────────────────────────────────┐   │
//! │  │                 LobbyRegistry (Arc<RwLock>)                   │   │
//! │  │                                                               │   │
//! │  │  (service, id) ──► LobbyEntry { lobby, owner: RelayTarget }   │   │
//! │  └──────────────────────────────────────────────────────────────┘   │
//! │                                                                      │
//! │  WebSocket Server ──► ConnectionState per peer                       │
//! │    - Session: lobbies this peer published                            │
//! │    - RpcPeer: calls the relay makes *to* this peer                   │
//! │    - On close: pending calls fail, owned lobbies are swept           │
//! │                                                                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol
//!
//! All frames are JSON over WebSocket, in both directions:
//!
//! ```json
//! // Peer -> Relay
//! {"type": "call", "id": 1, "method": "lobby.new", "params": {"id": "1", "name": "Duck"}}
//! {"type": "call", "id": 2, "method": "lobby.list", "params": {"location": {"latitude": 1, "longitude": 2}}}
//! {"type": "call", "id": 3, "method": "lobby.connect", "params": {"id": "1", "payload": "offer"}}
//!
//! // Relay -> lobby creator
//! {"type": "call", "id": 1, "method": "client.connect", "params": {"id": "1", "payload": "offer"}}
//!
//! // Either direction
//! {"type": "reply", "id": 1, "result": {}}
//! {"type": "reply", "id": 3, "error": "can't find the requested lobby"}
//! ```

pub mod client;
pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod rpc;
pub mod server;
pub mod session;

pub use client::{ConnectHandler, RelayClient};
pub use connection::handle_connection;
pub use handlers::LobbyService;
pub use protocol::{
    ConnectLobbyRequest, ConnectLobbyResponse, Frame, ListLobbyRequest, ListLobbyResponse, Lobby,
    LobbyKey, Method, NewLobbyResponse,
};
pub use registry::{LobbyEntry, LobbyRegistry, RegistryStats};
pub use rpc::{ClientId, RelayTarget, RpcPeer};
pub use server::RelayServer;
pub use session::Session;
