//! Listener, logging and instance identity settings

use serde::Deserialize;
use std::net::SocketAddr;

use crate::domain::foundation::InstanceId;

use super::error::ValidationError;

/// Settings for the HTTP/WebSocket listener and process-wide concerns.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Listener port, also part of the derived instance id
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub environment: Environment,

    /// Tracing filter directive, used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format. Production defaults to JSON, everything else to pretty.
    pub log_format: Option<LogFormat>,

    /// Comma-separated browser origins allowed to open sockets. Empty means any.
    pub cors_origins: Option<String>,

    /// Name stamped on published events. Derived from the host when unset.
    pub instance_id: Option<String>,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl ServerConfig {
    /// Address the listener binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, ValidationError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|_| ValidationError::InvalidBindAddress(addr))
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// The configured format, or the environment's default.
    pub fn effective_log_format(&self) -> LogFormat {
        match (self.log_format, self.environment) {
            (Some(format), _) => format,
            (None, Environment::Production) => LogFormat::Json,
            (None, _) => LogFormat::Pretty,
        }
    }

    /// Allowed origins, trimmed, blanks skipped.
    pub fn cors_origins_list(&self) -> Vec<String> {
        let Some(raw) = self.cors_origins.as_deref() else {
            return Vec::new();
        };
        raw.split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect()
    }

    /// The configured instance id, else `HOSTNAME:port`, else a random id.
    pub fn resolve_instance_id(&self) -> InstanceId {
        if let Some(id) = self.instance_id.as_deref().map(str::trim) {
            if !id.is_empty() {
                return InstanceId::new(id);
            }
        }
        match std::env::var("HOSTNAME") {
            Ok(host) if !host.trim().is_empty() => {
                InstanceId::new(format!("{}:{}", host.trim(), self.port))
            }
            _ => InstanceId::generate(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        self.socket_addr().map(|_| ())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
            log_level: default_log_level(),
            log_format: None,
            cors_origins: None,
            instance_id: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info,chat_fanout=debug,tower_http=info".to_string()
}
