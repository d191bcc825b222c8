//! Peer-side client for the relay
//!
//! Opens a WebSocket to the relay, issues `lobby.*` calls and, for peers
//! that host lobbies, answers the relay's `client.connect` calls.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::error::{RelayError, Result};
use crate::relay::protocol::{
    parse_params, ConnectLobbyRequest, ConnectLobbyResponse, Frame, ListLobbyRequest,
    ListLobbyResponse, Lobby, CLIENT_CONNECT, LOBBY_CONNECT, LOBBY_LIST, LOBBY_NEW,
};
use crate::relay::rpc::{new_client_id, RpcPeer};

type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Answers connect requests relayed from other peers to our lobbies
pub type ConnectHandler =
    Arc<dyn Fn(ConnectLobbyRequest) -> Result<ConnectLobbyResponse> + Send + Sync>;

/// A peer's connection to the relay.
///
/// Dropping the client closes the socket, which makes the relay remove
/// every lobby it published.
pub struct RelayClient {
    peer: Arc<RpcPeer>,
    shutdown: Option<oneshot::Sender<()>>,
    driver: Option<JoinHandle<()>>,
}

impl RelayClient {
    /// Connect without hosting lobbies
    pub async fn connect(url: &str) -> Result<Self> {
        Self::open(url, None).await
    }

    /// Connect and answer `client.connect` with `handler`
    pub async fn connect_with_handler(url: &str, handler: ConnectHandler) -> Result<Self> {
        Self::open(url, Some(handler)).await
    }

    async fn open(url: &str, handler: Option<ConnectHandler>) -> Result<Self> {
        let (ws, _) = connect_async(url).await?;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let peer = RpcPeer::new(new_client_id(), outbound_tx);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let driver = tokio::spawn(drive(
            ws,
            Arc::clone(&peer),
            outbound_rx,
            shutdown_rx,
            handler,
        ));
        tracing::debug!("{}: connected to {}", peer.client_id(), url);

        Ok(Self {
            peer,
            shutdown: Some(shutdown_tx),
            driver: Some(driver),
        })
    }

    /// Local identifier, only meaningful in logs
    pub fn client_id(&self) -> &str {
        self.peer.client_id()
    }

    /// Raw call, for methods without a typed wrapper
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.peer.request(method, params).await
    }

    /// Publish or update `lobby`
    pub async fn new_lobby(&self, lobby: &Lobby) -> Result<()> {
        self.call(LOBBY_NEW, serde_json::to_value(lobby)?).await?;
        Ok(())
    }

    pub async fn list_lobbies(&self, req: &ListLobbyRequest) -> Result<Vec<Lobby>> {
        let value = self.call(LOBBY_LIST, serde_json::to_value(req)?).await?;
        let resp: ListLobbyResponse = parse_params(value)?;
        Ok(resp.lobbies)
    }

    /// Ask the creator of `req.id` to accept us
    pub async fn connect_lobby(&self, req: &ConnectLobbyRequest) -> Result<ConnectLobbyResponse> {
        let value = self.call(LOBBY_CONNECT, serde_json::to_value(req)?).await?;
        parse_params(value)
    }

    /// Close the socket and wait for the connection task to finish
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(driver) = self.driver.take() {
            let _ = driver.await;
        }
    }
}

async fn drive(
    mut ws: ClientStream,
    peer: Arc<RpcPeer>,
    mut outbound_rx: mpsc::UnboundedReceiver<Frame>,
    mut shutdown_rx: oneshot::Receiver<()>,
    handler: Option<ConnectHandler>,
) {
    loop {
        tokio::select! {
            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let frame: Frame = match serde_json::from_str(&text) {
                            Ok(frame) => frame,
                            Err(e) => {
                                tracing::warn!("{}: ignoring malformed frame: {}", peer.client_id(), e);
                                continue;
                            }
                        };
                        let response = match frame {
                            Frame::Call { id, method, params } => {
                                Some(Frame::reply(id, answer(handler.as_ref(), &method, params)))
                            }
                            Frame::Reply { id, result, error } => {
                                peer.resolve(id, result, error);
                                None
                            }
                            Frame::Ping => Some(Frame::Pong),
                            Frame::Pong => None,
                        };
                        if let Some(frame) = response {
                            if let Err(e) = write(&mut ws, &frame).await {
                                tracing::warn!("{}: failed to write frame: {}", peer.client_id(), e);
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::warn!("{}: WebSocket error: {}", peer.client_id(), e);
                        break;
                    }
                    _ => {}
                }
            }

            frame = outbound_rx.recv() => {
                let Some(frame) = frame else { break };
                if let Err(e) = write(&mut ws, &frame).await {
                    tracing::warn!("{}: failed to write frame: {}", peer.client_id(), e);
                    break;
                }
            }

            // Explicit close, or the client was dropped
            _ = &mut shutdown_rx => {
                let _ = ws.close(None).await;
                break;
            }
        }
    }

    peer.close();
    tracing::debug!("{}: disconnected from relay", peer.client_id());
}

fn answer(handler: Option<&ConnectHandler>, method: &str, params: Value) -> Result<Value> {
    match (method, handler) {
        (CLIENT_CONNECT, Some(handler)) => {
            let req: ConnectLobbyRequest = parse_params(params)?;
            let resp = handler(req)?;
            Ok(serde_json::to_value(resp)?)
        }
        _ => Err(RelayError::UnknownMethod(method.to_string())),
    }
}

async fn write(ws: &mut ClientStream, frame: &Frame) -> Result<()> {
    let json = serde_json::to_string(frame)?;
    ws.send(Message::Text(json)).await?;
    Ok(())
}
