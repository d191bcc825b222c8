//! Error types for lobby-relay

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Main error type for relay operations
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("a lobby with that ID has already been created by someone else")]
    AlreadyExists,

    #[error("can't find the requested lobby")]
    NotFound,

    #[error("invalid credentials")]
    NotAuthorized,

    /// The connection a call was addressed to has gone away. The id is
    /// for logs and never reaches the wire.
    #[error("lobby creator is no longer reachable")]
    PeerGone { client_id: String },

    /// Error message produced by the remote side of a call, kept verbatim.
    #[error("{0}")]
    Remote(String),

    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Rebuild an error from the message string carried in a reply frame.
    ///
    /// Messages that match one of the domain errors come back as that
    /// variant; anything else stays a `Remote` error. Either way the
    /// `Display` output equals `message`.
    pub fn from_remote(message: String) -> Self {
        if message == Self::AlreadyExists.to_string() {
            Self::AlreadyExists
        } else if message == Self::NotFound.to_string() {
            Self::NotFound
        } else if message == Self::NotAuthorized.to_string() {
            Self::NotAuthorized
        } else {
            Self::Remote(message)
        }
    }

    pub(crate) fn peer_gone(client_id: &str) -> Self {
        Self::PeerGone {
            client_id: client_id.to_string(),
        }
    }
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
