//! Relay protocol message types
//!
//! Defines the JSON envelope exchanged in both directions over the
//! WebSocket, and the request/response bodies of each method.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RelayError, Result};
use crate::geo::Location;

/// Publish or update a lobby (peer -> relay)
pub const LOBBY_NEW: &str = "lobby.new";
/// Discover visible lobbies (peer -> relay)
pub const LOBBY_LIST: &str = "lobby.list";
/// Ask a lobby's creator to accept a connection (peer -> relay)
pub const LOBBY_CONNECT: &str = "lobby.connect";
/// Relayed connect request (relay -> lobby creator)
pub const CLIENT_CONNECT: &str = "client.connect";

/// One frame on the wire, in either direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Invoke `method` on the receiving side
    Call {
        id: u64,
        method: String,
        #[serde(default)]
        params: Value,
    },
    /// Outcome of the call with the same `id` sent by the receiver
    Reply {
        id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Liveness check
    Ping,
    /// Answer to `Ping`
    Pong,
}

impl Frame {
    /// Build the reply frame for call `id`
    pub fn reply(id: u64, outcome: Result<Value>) -> Self {
        match outcome {
            Ok(result) => Frame::Reply {
                id,
                result: Some(result),
                error: None,
            },
            Err(e) => Frame::Reply {
                id,
                result: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Methods the relay itself serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    NewLobby,
    ListLobbies,
    ConnectLobby,
}

impl Method {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            LOBBY_NEW => Some(Self::NewLobby),
            LOBBY_LIST => Some(Self::ListLobbies),
            LOBBY_CONNECT => Some(Self::ConnectLobby),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::NewLobby => LOBBY_NEW,
            Self::ListLobbies => LOBBY_LIST,
            Self::ConnectLobby => LOBBY_CONNECT,
        }
    }

    /// Whether serving the call waits on another connection
    pub fn is_relayed(&self) -> bool {
        matches!(self, Self::ConnectLobby)
    }
}

/// Registry key: lobbies are unique per (service, id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LobbyKey {
    pub service: String,
    pub id: String,
}

impl LobbyKey {
    pub fn new(service: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for LobbyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.service.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{}/{}", self.service, self.id)
        }
    }
}

/// An advertised, joinable session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Lobby {
    /// Tenant namespace; empty for the default namespace
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service: String,
    pub id: String,
    pub name: String,
    pub creator: String,
    /// Left out of discovery, still connectable by id
    pub hidden: bool,
    /// Advisory only; the creator checks passwords itself
    pub requires_password: bool,
    /// Never sent back in discovery results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Kilometers from the caller, only set in discovery results
    pub distance: f64,
    /// Advisory counters, not enforced
    pub people: i64,
    pub capacity: i64,
}

impl Lobby {
    pub fn key(&self) -> LobbyKey {
        LobbyKey::new(self.service.clone(), self.id.clone())
    }
}

/// Response to `lobby.new`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewLobbyResponse {}

/// Request for `lobby.list`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListLobbyRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

/// Response to `lobby.list`: visible lobbies, nearest first when the
/// request carried a location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListLobbyResponse {
    pub lobbies: Vec<Lobby>,
}

/// Request for `lobby.connect`, forwarded as-is to `client.connect`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectLobbyRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service: String,
    pub id: String,
    /// Opaque signaling payload, e.g. a WebRTC offer
    pub payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ConnectLobbyRequest {
    pub fn key(&self) -> LobbyKey {
        LobbyKey::new(self.service.clone(), self.id.clone())
    }
}

/// Response to `lobby.connect` / `client.connect`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectLobbyResponse {
    /// Opaque signaling payload, e.g. a WebRTC answer
    pub payload: String,
}

/// Decode call params, treating a missing body as the default request
pub fn parse_params<T: DeserializeOwned + Default>(params: Value) -> Result<T> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params).map_err(RelayError::from)
}
