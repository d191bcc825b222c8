//! Lobby registry
//!
//! Process-wide map from `LobbyKey` to the advertised lobby and the
//! connection that owns it.
//!
//! # Locking
//!
//! - `RwLock` (parking_lot): discovery reads proceed together, register
//!   and disconnect sweeps are exclusive
//! - Each operation takes the lock for exactly one lookup or mutation
//! - Nothing awaits while holding the lock; relayed calls use the owner
//!   handle cloned out of `get`

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{RelayError, Result};
use crate::relay::protocol::{Lobby, LobbyKey};
use crate::relay::rpc::RelayTarget;

/// A registered lobby and the connection that will receive relayed calls
#[derive(Clone)]
pub struct LobbyEntry {
    pub lobby: Lobby,
    pub owner: Arc<dyn RelayTarget>,
}

impl std::fmt::Debug for LobbyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobbyEntry")
            .field("lobby", &self.lobby)
            .field("owner", &self.owner.client_id())
            .finish()
    }
}

/// Shared registry of every live lobby
#[derive(Default)]
pub struct LobbyRegistry {
    lobbies: RwLock<HashMap<LobbyKey, LobbyEntry>>,
}

impl LobbyRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a lobby.
    ///
    /// Fails with `AlreadyExists` if the key is held by a different
    /// connection; the stored entry is left untouched in that case.
    /// Owners are compared by handle identity, never by `client_id`.
    pub fn put(&self, lobby: Lobby, owner: Arc<dyn RelayTarget>) -> Result<()> {
        let key = lobby.key();
        let mut lobbies = self.lobbies.write();
        if let Some(existing) = lobbies.get(&key) {
            if !same_owner(&existing.owner, &owner) {
                return Err(RelayError::AlreadyExists);
            }
        }
        lobbies.insert(key, LobbyEntry { lobby, owner });
        Ok(())
    }

    /// Look up a lobby and its owner
    pub fn get(&self, key: &LobbyKey) -> Result<LobbyEntry> {
        self.lobbies
            .read()
            .get(key)
            .cloned()
            .ok_or(RelayError::NotFound)
    }

    /// Snapshot of the non-hidden lobbies in `service`, in no particular order
    pub fn list_visible(&self, service: &str) -> Vec<Lobby> {
        self.lobbies
            .read()
            .iter()
            .filter(|(key, entry)| key.service == service && !entry.lobby.hidden)
            .map(|(_, entry)| entry.lobby.clone())
            .collect()
    }

    /// Remove every listed key; absent keys are ignored
    pub fn remove_all(&self, keys: &[LobbyKey]) -> usize {
        if keys.is_empty() {
            return 0;
        }
        let mut lobbies = self.lobbies.write();
        let mut removed = 0;
        for key in keys {
            if lobbies.remove(key).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Get stats about the registry
    pub fn stats(&self) -> RegistryStats {
        let lobbies = self.lobbies.read();
        RegistryStats {
            lobby_count: lobbies.len(),
            hidden_count: lobbies.values().filter(|e| e.lobby.hidden).count(),
        }
    }
}

/// Whether two handles point at the same connection. Only the data
/// pointers are compared; vtable pointers for one type may differ.
fn same_owner(a: &Arc<dyn RelayTarget>, b: &Arc<dyn RelayTarget>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Statistics about the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub lobby_count: usize,
    pub hidden_count: usize,
}
