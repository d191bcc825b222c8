//! Per-connection session state
//!
//! Tracks which lobbies a connection has published so they can be swept
//! from the registry when it closes. A session lives exactly as long as
//! its connection task.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{RelayError, Result};
use crate::relay::protocol::LobbyKey;
use crate::relay::rpc::RelayTarget;

#[derive(Default)]
struct OwnedLobbies {
    closed: bool,
    keys: Vec<LobbyKey>,
}

/// State for a single connection
pub struct Session {
    peer: Arc<dyn RelayTarget>,
    owned: Mutex<OwnedLobbies>,
}

impl Session {
    pub fn new(peer: Arc<dyn RelayTarget>) -> Self {
        Self {
            peer,
            owned: Mutex::new(OwnedLobbies::default()),
        }
    }

    pub fn client_id(&self) -> &str {
        self.peer.client_id()
    }

    /// Relay capability of this connection
    pub fn peer(&self) -> &Arc<dyn RelayTarget> {
        &self.peer
    }

    /// Run `publish` and record `key` as owned by this connection.
    ///
    /// Both happen under the session lock, so a concurrent `forget` sees
    /// either the finished registration or a closed session. Keys are
    /// recorded once no matter how often the lobby is re-registered.
    pub fn record_ownership<F>(&self, key: LobbyKey, publish: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut owned = self.owned.lock();
        if owned.closed {
            return Err(RelayError::peer_gone(self.client_id()));
        }
        publish()?;
        if !owned.keys.contains(&key) {
            owned.keys.push(key);
        }
        Ok(())
    }

    /// Keys published by this connection, in registration order
    pub fn owned_ids(&self) -> Vec<LobbyKey> {
        self.owned.lock().keys.clone()
    }

    /// Close the session and hand back everything it owned
    pub fn forget(&self) -> Vec<LobbyKey> {
        let mut owned = self.owned.lock();
        owned.closed = true;
        std::mem::take(&mut owned.keys)
    }
}
