//! Gridmatch server binary.

#![warn(missing_docs)]

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gridmatch_server::cli::{Cli, Command};
use gridmatch_server::{
    DieselSink, Gateway, MemorySink, ServerConfig, SessionRegistry, StatsSink,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            bind,
            db_path,
        } => serve(config, bind, db_path).await,
    }
}

async fn serve(
    config_path: std::path::PathBuf,
    bind: Option<String>,
    db_path: Option<String>,
) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,gridmatch_server=debug")),
        )
        .init();

    let mut config = if config_path.exists() {
        ServerConfig::from_file(&config_path)?
    } else {
        info!(
            "Config file not found at {}, using defaults",
            config_path.display()
        );
        ServerConfig::default()
    };
    if let Some(bind) = bind {
        config = config.with_bind(bind);
    }
    if let Some(db_path) = db_path {
        config = config.with_database(Some(db_path));
    }

    let sink: Arc<dyn StatsSink> = match config.database() {
        Some(db_path) => {
            info!(db_path = %db_path, "Using SQLite statistics store");
            DieselSink::open(db_path.clone())?
        }
        None => {
            info!("No database configured, statistics kept in memory");
            Arc::new(MemorySink::new())
        }
    };

    let registry = SessionRegistry::new(sink.clone());
    let gateway = Gateway::new(registry, sink);
    let app = gateway.router();

    let listener = tokio::net::TcpListener::bind(config.bind()).await?;
    info!(bind = %config.bind(), "Gateway listening for WebSocket connections at /ws");
    axum::serve(listener, app).await?;

    Ok(())
}
