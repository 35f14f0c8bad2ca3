use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::handler::Handlers;
use crate::http::connection::Connection;

/// Binds `cfg.server.listen_addr` and serves until the task is dropped.
pub async fn run(cfg: &Config, handlers: Arc<Handlers>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.server.listen_addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    serve(
        listener,
        handlers,
        Duration::from_secs(cfg.server.idle_timeout_secs),
    )
    .await
}

/// Accepts connections on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    handlers: Arc<Handlers>,
    idle_timeout: Duration,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        tracing::debug!("Accepted connection from {}", peer);

        let handlers = Arc::clone(&handlers);
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, handlers, idle_timeout);
            if let Err(e) = conn.run().await {
                tracing::debug!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
