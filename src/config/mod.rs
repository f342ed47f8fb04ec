//! Process configuration for a chat fanout instance.
//!
//! Loaded from the environment with the `config` and `dotenvy` crates.
//! Variables use the `CHAT_FANOUT` prefix and `__` between section and key.
//!
//! # Example
//!
//! ```no_run
//! use chat_fanout::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr().unwrap());
//! ```

mod broker;
mod chat;
mod directory;
mod error;
mod server;

pub use broker::BrokerConfig;
pub use chat::ChatConfig;
pub use directory::DirectoryConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, LogFormat, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a working
/// development setup against a local Redis.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (bind address, logging, instance id)
    #[serde(default)]
    pub server: ServerConfig,

    /// Broker configuration (Redis pub/sub exchange)
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Per-connection limits and heartbeat
    #[serde(default)]
    pub chat: ChatConfig,

    /// Seed data for the in-memory directory
    #[serde(default)]
    pub directory: DirectoryConfig,
}

impl AppConfig {
    /// Reads `.env` (when present) and then `CHAT_FANOUT__*` variables.
    ///
    /// `CHAT_FANOUT__CHAT__PONG_WAIT_SECS=90` sets `chat.pong_wait_secs`;
    /// anything unset keeps its default. Values are parsed but not
    /// validated here, call [`AppConfig::validate`] once logging is up.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CHAT_FANOUT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Checks every section, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.broker.validate()?;
        self.chat.validate()?;
        self.directory.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
