use anyhow::{Context, Result};
use clap::Parser;
use figment::providers::Serialized;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use gloom_chat::config::{AppConfig, DEFAULT_CONFIG_PATH, load_config};
use gloom_chat::server::ChatServer;

#[derive(Parser)]
#[command(name = "gloom-chat")]
#[command(about = "In-memory WebSocket chat relay")]
struct Args {
    /// Config file (missing file is fine; defaults apply)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Host to bind to
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Port for the web server (0 = auto-select)
    #[arg(short, long)]
    port: Option<u16>,

    /// Number of recent messages replayed to new users
    #[arg(long)]
    history_limit: Option<usize>,

    /// Directory of static client assets
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let default_directive = if args.debug {
        "gloom_chat=debug,tower_http=debug,info"
    } else {
        "gloom_chat=info,tower_http=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    info!("Starting Gloom Chat");

    // CLI flags sit on top of file and env layers
    let mut figment = load_config(&args.config);
    if let Some(host) = args.host {
        figment = figment.merge(Serialized::default("server.host", host));
    }
    if let Some(port) = args.port {
        figment = figment.merge(Serialized::default("server.port", port));
    }
    if let Some(limit) = args.history_limit {
        figment = figment.merge(Serialized::default("relay.history_limit", limit));
    }
    if let Some(dir) = args.static_dir {
        figment = figment.merge(Serialized::default("server.static_dir", dir));
    }

    let config = AppConfig::extract(&figment).context("Invalid configuration")?;
    let server = ChatServer::bind(config)
        .await
        .context("Failed to start server")?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, shutting down...");
    };

    server.run(shutdown_signal).await.context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}
