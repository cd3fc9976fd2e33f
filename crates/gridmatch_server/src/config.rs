//! Server configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Configuration for the gateway server.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind the WebSocket gateway to.
    #[serde(default = "default_bind")]
    bind: String,

    /// Path to the SQLite statistics database. When absent, statistics
    /// are kept in memory and lost on shutdown.
    #[serde(default)]
    database: Option<String>,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            database: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(bind = %config.bind, "Config loaded successfully");
        Ok(config)
    }

    /// Overrides the bind address.
    pub fn with_bind(mut self, bind: String) -> Self {
        self.bind = bind;
        self
    }

    /// Overrides the database path.
    pub fn with_database(mut self, database: Option<String>) -> Self {
        self.database = database;
        self
    }
}

/// Configuration error carrying the code location that raised it.
#[derive(Debug, Clone, Display, Error)]
#[display("config error at {location}: {message}")]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Code location that raised the error.
    pub location: &'static std::panic::Location<'static>,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        Self {
            message,
            location: std::panic::Location::caller(),
        }
    }
}
