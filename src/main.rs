//! initrackd - initiative tracker daemon

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use initrack::{Config, Server};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initiative tracker daemon
#[derive(Parser, Debug)]
#[command(name = "initrackd", version, about = "Serve a tabletop combat tracker")]
struct Args {
    /// Config file (defaults to ./initrack.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// SQLite file for the session (in-memory if omitted)
    #[arg(short, long)]
    database: Option<String>,

    /// Relay origin for character sheet fetches
    #[arg(long)]
    relay_origin: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "initrack=info,initrackd=info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let mut config = Config::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(database) = args.database {
        config.db_path = Some(database);
    }
    if let Some(relay_origin) = args.relay_origin {
        config.relay_origin = Some(relay_origin);
    }

    if config.db_path.is_none() {
        info!("No database path configured, session will not survive a restart");
    }

    let server = Server::new(config).await?;
    server.run().await?;

    Ok(())
}
