//! Outbound calls over a connection
//!
//! Every connection is also a callee: the relay forwards `lobby.connect`
//! to the lobby creator's own socket and waits for its reply. `RpcPeer`
//! owns the table of calls that are still waiting, keyed by call id.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::{RelayError, Result};
use crate::relay::protocol::Frame;

/// Stable identity of a connection for its whole lifetime
pub type ClientId = String;

/// Generate a fresh connection id
pub fn new_client_id() -> ClientId {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("cli_{}", &uuid[..8])
}

/// A connection that can receive relayed calls.
///
/// Stored next to each lobby in the registry so `lobby.connect` can reach
/// the creator without holding any registry lock.
pub trait RelayTarget: Send + Sync {
    fn client_id(&self) -> &str;

    /// Invoke `method` on the remote side and wait for its reply
    fn call(&self, method: &'static str, params: Value) -> BoxFuture<'_, Result<Value>>;
}

type Waiter = oneshot::Sender<Result<Value>>;

#[derive(Default)]
struct PendingCalls {
    closed: bool,
    next_id: u64,
    waiting: HashMap<u64, Waiter>,
}

/// Caller side of a duplex connection
pub struct RpcPeer {
    client_id: ClientId,
    outbound: mpsc::UnboundedSender<Frame>,
    pending: Mutex<PendingCalls>,
}

impl RpcPeer {
    /// Create a peer whose frames are written by whoever drains `outbound`
    pub fn new(client_id: ClientId, outbound: mpsc::UnboundedSender<Frame>) -> Arc<Self> {
        Arc::new(Self {
            client_id,
            outbound,
            pending: Mutex::new(PendingCalls::default()),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Queue a frame for the connection's writer
    pub fn send(&self, frame: Frame) -> Result<()> {
        self.outbound
            .send(frame)
            .map_err(|_| RelayError::peer_gone(&self.client_id))
    }

    /// Issue a call and wait for the matching reply
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let (tx, rx) = oneshot::channel();
        let id = {
            let mut pending = self.pending.lock();
            if pending.closed {
                return Err(RelayError::peer_gone(&self.client_id));
            }
            pending.next_id += 1;
            let id = pending.next_id;
            pending.waiting.insert(id, tx);
            id
        };

        let frame = Frame::Call {
            id,
            method: method.to_string(),
            params,
        };
        if let Err(e) = self.send(frame) {
            self.pending.lock().waiting.remove(&id);
            return Err(e);
        }

        match rx.await {
            Ok(outcome) => outcome,
            // Waiter dropped by close()
            Err(_) => Err(RelayError::peer_gone(&self.client_id)),
        }
    }

    /// Hand a reply frame to the call waiting on `id`
    pub fn resolve(&self, id: u64, result: Option<Value>, error: Option<String>) {
        let Some(waiter) = self.pending.lock().waiting.remove(&id) else {
            tracing::debug!("{}: reply for unknown call {}", self.client_id, id);
            return;
        };
        let outcome = match error {
            Some(message) => Err(RelayError::from_remote(message)),
            None => Ok(result.unwrap_or(Value::Null)),
        };
        // The caller may have given up already
        let _ = waiter.send(outcome);
    }

    /// Fail every waiting call and refuse new ones
    pub fn close(&self) {
        let waiting = {
            let mut pending = self.pending.lock();
            pending.closed = true;
            std::mem::take(&mut pending.waiting)
        };
        if !waiting.is_empty() {
            tracing::info!(
                "{}: failing {} in-flight call(s) on close",
                self.client_id,
                waiting.len()
            );
        }
        for (_, waiter) in waiting {
            let _ = waiter.send(Err(RelayError::peer_gone(&self.client_id)));
        }
    }

    pub fn in_flight(&self) -> usize {
        self.pending.lock().waiting.len()
    }
}

impl RelayTarget for RpcPeer {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn call(&self, method: &'static str, params: Value) -> BoxFuture<'_, Result<Value>> {
        Box::pin(self.request(method, params))
    }
}
