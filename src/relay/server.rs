//! TCP accept loop for the relay

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::RelayConfig;
use crate::error::Result;
use crate::relay::connection::handle_connection;
use crate::relay::handlers::LobbyService;
use crate::relay::registry::LobbyRegistry;

/// A bound relay, ready to accept peers
pub struct RelayServer {
    listener: TcpListener,
    service: Arc<LobbyService>,
    path: Arc<str>,
}

impl RelayServer {
    /// Bind the listener with a fresh registry
    pub async fn bind(config: &RelayConfig) -> Result<Self> {
        Self::bind_with_registry(config, Arc::new(LobbyRegistry::new())).await
    }

    /// Bind the listener serving an existing registry
    pub async fn bind_with_registry(
        config: &RelayConfig,
        registry: Arc<LobbyRegistry>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(config.listen).await?;
        Ok(Self {
            listener,
            service: Arc::new(LobbyService::new(registry)),
            path: Arc::from(config.path.as_str()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// WebSocket URL peers should dial
    pub fn url(&self) -> Result<String> {
        Ok(format!("ws://{}{}", self.local_addr()?, self.path))
    }

    pub fn registry(&self) -> &Arc<LobbyRegistry> {
        self.service.registry()
    }

    /// Accept connections forever
    pub async fn run(self) {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Accept connections until `shutdown` resolves. Connections already
    /// accepted keep running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        if let Ok(url) = self.url() {
            tracing::info!("Lobby relay listening on {}", url);
        }

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            tracing::debug!("Accepted connection from {}", addr);
                            let service = Arc::clone(&self.service);
                            let path = Arc::clone(&self.path);
                            tokio::spawn(async move {
                                handle_connection(stream, service, path).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutting down lobby relay");
                    break;
                }
            }
        }
    }
}
