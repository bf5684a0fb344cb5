use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Config;
use crate::http::connection::{Connection, ConnectionSettings};
use crate::http::router::Router;

/// Binds the configured address and serves connections forever.
///
/// Failing to bind is the only error that ends the server.
pub async fn run(cfg: &Config, router: Arc<Router>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen_addr))?;
    info!("Listening on {}", cfg.listen_addr);

    serve(listener, router, cfg.connection_settings()).await
}

/// Accepts on an already bound listener, one task per connection.
pub async fn serve(
    listener: TcpListener,
    router: Arc<Router>,
    settings: ConnectionSettings,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let conn = Connection::new(socket, router.clone(), settings);
        tokio::spawn(async move {
            match conn.run().await {
                Ok(()) => info!("Connection from {} closed", peer),
                Err(e) => error!("Connection error from {}: {}", peer, e),
            }
        });
    }
}
