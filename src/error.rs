//! Error types for event handling.
//!
//! [`EventError`] covers events that decode but cannot be turned into
//! downstream requests; [`DispatchError`] covers a single failed downstream
//! call. Neither is ever fatal to the server.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dispatch::Target;

/// The event decoded but lacks what a DNS record needs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("event data has no SCALR_EVENT_SERVER_HOSTNAME")]
    MissingHostname,

    #[error("event data has neither an external nor an internal IP")]
    MissingAddress,

    #[error("'{0}' is not an IPv4 address, cannot build an A record")]
    InvalidAddress(String),
}

/// One downstream call did not answer 200.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{target}: timed out (connect limit {connect_secs}s, total limit {request_secs}s)")]
    Timeout { target: Target, connect_secs: u64, request_secs: u64 },

    #[error("{target}: request failed: {source}")]
    Transport {
        target: Target,
        #[source]
        source: reqwest::Error,
    },

    #[error("{target}: unexpected response status {status}")]
    UnexpectedStatus { target: Target, status: StatusCode },
}

impl DispatchError {
    pub fn target(&self) -> Target {
        match self {
            DispatchError::Timeout { target, .. }
            | DispatchError::Transport { target, .. }
            | DispatchError::UnexpectedStatus { target, .. } => *target,
        }
    }
}
