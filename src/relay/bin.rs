//! Lobby Relay Binary
//!
//! Serves the lobby protocol on `ws://<host>:<port>/ws`.
//!
//! # Usage
//!
//! ```bash
//! lobby-relay --port 5000
//! lobby-relay --port 5000 --host 127.0.0.1
//! ```

use std::net::SocketAddr;

use clap::Parser;

use lobby_relay::config::{RelayConfig, DEFAULT_PORT};
use lobby_relay::relay::RelayServer;

/// Lobby relay daemon
#[derive(Parser, Debug)]
#[command(name = "lobby-relay")]
#[command(about = "Rendezvous and signaling relay for peer-to-peer lobbies")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "LOBBY_RELAY_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Host to bind to
    #[arg(long, env = "LOBBY_RELAY_HOST", default_value = "0.0.0.0")]
    host: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lobby_relay=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;

    let server = RelayServer::bind(&RelayConfig::new(addr)).await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}
