//! WebSocket connection handler
//!
//! Manages individual peer connections: frame routing, relayed calls to
//! the peer, and cleanup when the socket closes.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message, WebSocketStream};

use crate::error::{RelayError, Result};
use crate::relay::handlers::LobbyService;
use crate::relay::protocol::{Frame, Method};
use crate::relay::rpc::{new_client_id, RpcPeer};
use crate::relay::session::Session;

/// Handle a single WebSocket connection
pub async fn handle_connection(stream: TcpStream, service: Arc<LobbyService>, path: Arc<str>) {
    let addr = stream.peer_addr().ok();
    tracing::debug!("New connection from {:?}", addr);

    let ws_stream = match accept_hdr_async(stream, |req: &Request, resp: Response| {
        check_path(req, resp, &path)
    })
    .await
    {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!("WebSocket handshake failed for {:?}: {}", addr, e);
            return;
        }
    };

    let mut conn = ConnectionState::new(ws_stream, service);
    tracing::info!("Client {} connected from {:?}", conn.session.client_id(), addr);
    conn.run().await;

    tracing::info!("Connection closed from {:?}", addr);
}

/// Only upgrade requests for the relay's path
fn check_path(
    req: &Request,
    resp: Response,
    path: &str,
) -> std::result::Result<Response, ErrorResponse> {
    if req.uri().path() == path {
        return Ok(resp);
    }
    tracing::debug!("Rejecting upgrade for path {}", req.uri().path());
    let body = format!("no WebSocket endpoint at {}", req.uri().path());
    let mut not_found = ErrorResponse::new(Some(body));
    *not_found.status_mut() = StatusCode::NOT_FOUND;
    Err(not_found)
}

/// State for a single connection
struct ConnectionState {
    ws: WebSocketStream<TcpStream>,
    service: Arc<LobbyService>,
    peer: Arc<RpcPeer>,
    session: Arc<Session>,
    /// Frames queued by the peer handle and by spawned handlers
    outbound_rx: mpsc::UnboundedReceiver<Frame>,
}

impl ConnectionState {
    fn new(ws: WebSocketStream<TcpStream>, service: Arc<LobbyService>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let peer = RpcPeer::new(new_client_id(), outbound_tx);
        let session = Arc::new(Session::new(peer.clone()));
        Self {
            ws,
            service,
            peer,
            session,
            outbound_rx,
        }
    }

    async fn run(&mut self) {
        loop {
            tokio::select! {
                // Handle incoming WebSocket messages
                msg = self.ws.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Err(e) = self.handle_message(&text).await {
                                tracing::warn!("{}: failed to answer: {}", self.session.client_id(), e);
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::debug!("Client {} requested close", self.session.client_id());
                            break;
                        }
                        Some(Err(e)) => {
                            tracing::warn!("WebSocket error from {}: {}", self.session.client_id(), e);
                            break;
                        }
                        None => break,
                        // tungstenite answers pings on its own
                        _ => {}
                    }
                }

                // Relayed calls to this peer and replies from spawned handlers
                frame = self.outbound_rx.recv() => {
                    let Some(frame) = frame else { break };
                    if let Err(e) = self.send(&frame).await {
                        tracing::warn!("{}: failed to write frame: {}", self.session.client_id(), e);
                        break;
                    }
                }
            }
        }

        // Cleanup on disconnect
        self.cleanup();
    }

    async fn handle_message(&mut self, text: &str) -> Result<()> {
        let frame: Frame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("{}: ignoring malformed frame: {}", self.session.client_id(), e);
                return Ok(());
            }
        };

        match frame {
            Frame::Call { id, method, params } => {
                let Some(method) = Method::parse(&method) else {
                    let outcome = Err(RelayError::UnknownMethod(method));
                    return self.send(&Frame::reply(id, outcome)).await;
                };

                if method.is_relayed() {
                    // Waits on another connection; keep reading meanwhile
                    let service = Arc::clone(&self.service);
                    let session = Arc::clone(&self.session);
                    let peer = Arc::clone(&self.peer);
                    tokio::spawn(async move {
                        let outcome = service.dispatch(&session, method, params).await;
                        if peer.send(Frame::reply(id, outcome)).is_err() {
                            tracing::debug!(
                                "{}: dropped {} reply, connection closed",
                                session.client_id(),
                                method.name()
                            );
                        }
                    });
                    return Ok(());
                }

                let outcome = self.service.dispatch(&self.session, method, params).await;
                self.send(&Frame::reply(id, outcome)).await
            }

            Frame::Reply { id, result, error } => {
                self.peer.resolve(id, result, error);
                Ok(())
            }

            Frame::Ping => self.send(&Frame::Pong).await,

            Frame::Pong => Ok(()),
        }
    }

    async fn send(&mut self, frame: &Frame) -> Result<()> {
        let json = serde_json::to_string(frame)?;
        self.ws.send(Message::Text(json)).await?;
        Ok(())
    }

    fn cleanup(&mut self) {
        self.peer.close();
        self.service.disconnect(&self.session);
    }
}
