//! Handlers for the relay's three methods
//!
//! `LobbyService` holds the registry and serves `lobby.new`, `lobby.list`
//! and `lobby.connect` for any session. It knows nothing about sockets.

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::relay::protocol::{
    parse_params, ConnectLobbyRequest, ListLobbyRequest, ListLobbyResponse, Lobby, Method,
    NewLobbyResponse, CLIENT_CONNECT,
};
use crate::relay::registry::LobbyRegistry;
use crate::relay::session::Session;

pub struct LobbyService {
    registry: Arc<LobbyRegistry>,
}

impl LobbyService {
    pub fn new(registry: Arc<LobbyRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<LobbyRegistry> {
        &self.registry
    }

    /// Route a decoded call to its handler
    pub async fn dispatch(&self, session: &Session, method: Method, params: Value) -> Result<Value> {
        match method {
            Method::NewLobby => {
                let lobby: Lobby = parse_params(params)?;
                let resp = self.new_lobby(session, lobby)?;
                Ok(serde_json::to_value(resp)?)
            }
            Method::ListLobbies => {
                let req: ListLobbyRequest = parse_params(params)?;
                Ok(serde_json::to_value(self.list_lobbies(&req))?)
            }
            Method::ConnectLobby => self.connect_lobby(params).await,
        }
    }

    /// `lobby.new`: publish or update a lobby owned by `session`
    pub fn new_lobby(&self, session: &Session, mut lobby: Lobby) -> Result<NewLobbyResponse> {
        tracing::info!("{}: lobby.new {:?}", session.client_id(), lobby);
        // Only discovery results carry a distance
        lobby.distance = 0.0;
        let key = lobby.key();
        let owner = Arc::clone(session.peer());
        let registry = &self.registry;

        session
            .record_ownership(key.clone(), || registry.put(lobby, owner))
            .inspect_err(|e| {
                tracing::warn!("{}: lobby.new {} rejected: {}", session.client_id(), key, e)
            })?;
        Ok(NewLobbyResponse {})
    }

    /// `lobby.list`: visible lobbies, annotated with distance from the caller
    pub fn list_lobbies(&self, req: &ListLobbyRequest) -> ListLobbyResponse {
        tracing::debug!("lobby.list {:?}", req);
        let mut lobbies = self.registry.list_visible(&req.service);

        for lobby in &mut lobbies {
            lobby.distance = match (&req.location, &lobby.location) {
                (Some(origin), Some(location)) => origin.great_circle_distance(location),
                _ => 0.0,
            };
        }

        match req.location {
            // Nearest first, lobbies without a location last
            Some(_) => lobbies.sort_by(|a, b| match (&a.location, &b.location) {
                (Some(_), Some(_)) => a
                    .distance
                    .total_cmp(&b.distance)
                    .then_with(|| a.id.cmp(&b.id)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => a.id.cmp(&b.id),
            }),
            None => lobbies.sort_by(|a, b| a.id.cmp(&b.id)),
        }

        for lobby in &mut lobbies {
            lobby.location = None;
        }

        ListLobbyResponse { lobbies }
    }

    /// `lobby.connect`: forward the request to the lobby's creator.
    ///
    /// `params` go out untouched and the creator's reply or error comes
    /// back untouched. The registry lock is released before the call.
    pub async fn connect_lobby(&self, params: Value) -> Result<Value> {
        let req: ConnectLobbyRequest = parse_params(params.clone())?;
        let key = req.key();
        let entry = self.registry.get(&key).inspect_err(|_| {
            tracing::debug!("lobby.connect {}: no such lobby", key);
        })?;

        tracing::info!("lobby.connect {} -> {}", key, entry.owner.client_id());
        entry
            .owner
            .call(CLIENT_CONNECT, params)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    "lobby.connect {} via {} failed: {}",
                    key,
                    entry.owner.client_id(),
                    e
                )
            })
    }

    /// Sweep everything `session` published. Safe to call on a session
    /// that owns nothing.
    pub fn disconnect(&self, session: &Session) {
        let keys = session.forget();
        if keys.is_empty() {
            tracing::debug!("{}: disconnected with no lobbies", session.client_id());
            return;
        }
        let removed = self.registry.remove_all(&keys);
        tracing::info!(
            "{}: disconnected, removed {} lobby(ies), {} remain",
            session.client_id(),
            removed,
            self.registry.stats().lobby_count
        );
    }
}
