//! Command-line interface for the gridmatch server.

use clap::{Parser, Subcommand};

/// Gridmatch - real-time session manager for two-player games
#[derive(Parser, Debug)]
#[command(name = "gridmatch")]
#[command(about = "WebSocket session manager for two-player turn-based games", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the WebSocket gateway server
    Serve {
        /// Path to a TOML configuration file
        #[arg(short, long, default_value = "gridmatch.toml")]
        config: std::path::PathBuf,

        /// Socket address to bind (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Path to the SQLite statistics database (overrides config)
        #[arg(long)]
        db_path: Option<String>,
    },
}
