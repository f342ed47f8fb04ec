//! ConnectionState enum for tracking the lifecycle of one socket session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a live connection.
///
/// `Connecting` until both pumps run, `Closing` once either pump hits a
/// terminal condition, `Closed` after the socket is released and the
/// connection is gone from the registry. States only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Connecting,
    Active,
    Closing,
    Closed,
}

impl ConnectionState {
    /// Validates a transition from this state to another.
    ///
    /// Valid transitions:
    /// - Connecting -> Active
    /// - Connecting -> Closing
    /// - Active -> Closing
    /// - Closing -> Closed
    pub fn can_transition_to(&self, target: &ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, target),
            (Connecting, Active) | (Connecting, Closing) | (Active, Closing) | (Closing, Closed)
        )
    }

    /// Returns all valid target states from the current state.
    pub fn valid_transitions(&self) -> Vec<ConnectionState> {
        use ConnectionState::*;
        match self {
            Connecting => vec![Active, Closing],
            Active => vec![Closing],
            Closing => vec![Closed],
            Closed => vec![],
        }
    }

    /// True once teardown has started.
    pub fn is_terminating(&self) -> bool {
        matches!(self, ConnectionState::Closing | ConnectionState::Closed)
    }

    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Active => "active",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}
