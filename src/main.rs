use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rawhttp::config::Config;
use rawhttp::{routes, server};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "rawhttp", about = "HTTP/1.1 server over raw TCP")]
struct Cli {
    /// Directory served by the /files routes
    #[arg(long)]
    directory: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:4221
    #[arg(long)]
    listen: Option<String>,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let mut cfg = Config::load(cli.config.as_deref())?;
    if let Some(directory) = cli.directory {
        cfg.directory = directory;
    }
    if let Some(listen) = cli.listen {
        cfg.listen_addr = listen;
    }

    let router = Arc::new(routes::build_router(cfg.directory.clone())?);
    tracing::info!(
        directory = %cfg.directory.display(),
        routes = router.len(),
        "Starting server"
    );

    tokio::select! {
        res = server::listener::run(&cfg, router) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
