//! Chat connection limits and heartbeat timing

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Per-connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Frames buffered per connection before it counts as a slow consumer
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,

    /// Seconds between server pings
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    /// Seconds of client silence tolerated before the connection is dropped
    #[serde(default = "default_pong_wait")]
    pub pong_wait_secs: u64,

    /// Seconds allowed for one socket write
    #[serde(default = "default_write_wait")]
    pub write_wait_secs: u64,

    /// Largest inbound message, in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl ChatConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_secs)
    }

    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_secs)
    }

    /// Validate chat configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.outbox_capacity == 0 {
            return Err(ValidationError::MustBePositive("outbox_capacity"));
        }
        if self.ping_interval_secs == 0 {
            return Err(ValidationError::MustBePositive("ping_interval_secs"));
        }
        if self.write_wait_secs == 0 {
            return Err(ValidationError::MustBePositive("write_wait_secs"));
        }
        if self.max_message_size == 0 {
            return Err(ValidationError::MustBePositive("max_message_size"));
        }
        if self.pong_wait_secs <= self.ping_interval_secs {
            return Err(ValidationError::PingOutlastsPongWait);
        }
        Ok(())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: default_outbox_capacity(),
            ping_interval_secs: default_ping_interval(),
            pong_wait_secs: default_pong_wait(),
            write_wait_secs: default_write_wait(),
            max_message_size: default_max_message_size(),
        }
    }
}

fn default_outbox_capacity() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    54
}

fn default_pong_wait() -> u64 {
    60
}

fn default_write_wait() -> u64 {
    10
}

fn default_max_message_size() -> usize {
    4096
}
