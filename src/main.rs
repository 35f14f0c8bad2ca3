use std::sync::Arc;

use docroot::config::Config;
use docroot::handler::Handlers;
use docroot::server;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let mut cfg = Config::load()?;
    if cfg.defaults.default_dir().is_empty() {
        tracing::warn!("No document directory configured, serving the current directory");
        cfg.defaults.set_default_dir(".")?;
    }
    tracing::info!(
        root = cfg.defaults.default_dir(),
        default_page = cfg.defaults.default_page(),
        "Serving documents"
    );

    let handlers = Arc::new(Handlers::from_config(&cfg));

    tokio::select! {
        res = server::listener::run(&cfg, handlers) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
