//! Centralized error types for the core
//!
//! All public operations return `Result<T>`. Decode-time failures have
//! their own narrower type (`DecodeError`) since they are absorbed rather
//! than surfaced — see `codec`.

use std::fmt;
use std::net::SocketAddr;

/// All errors surfaced across the public API
#[derive(Debug)]
pub enum CoreError {
    /// Failed to bind the action (publish) socket
    ActionBind { addr: SocketAddr, source: std::io::Error },
    /// Failed to connect the observation (subscribe) socket
    ObservationConnect { addr: SocketAddr, source: std::io::Error },

    /// A transport was used after it was closed
    TransportClosed,
    /// The Controller was used after `shutdown()` (or after a fatal
    /// worker error closed it internally)
    ControllerClosed,
    /// `send_and_recv_match` exceeded its skip budget without finding a
    /// matching observation
    MatchTimeout { skipped: u32, last_sent: u64 },
    /// An operation was invoked outside the `RUNNING` state
    InvalidState { operation: &'static str },
    /// An observation declared a `protocol_version` that does not match
    /// this build. Fatal: the Controller shuts itself down.
    VersionMismatch { expected: u32, got: u32 },

    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },
    /// Failed to parse a config document
    ConfigParse { source: toml::de::Error },
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ActionBind { source, .. } | Self::ObservationConnect { source, .. } => {
                Some(source)
            }
            Self::ConfigParse { source } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActionBind { addr, .. } => write!(f, "cannot bind action channel on {addr}"),
            Self::ObservationConnect { addr, .. } => {
                write!(f, "cannot connect observation channel to {addr}")
            }
            Self::TransportClosed => write!(f, "transport closed"),
            Self::ControllerClosed => write!(f, "controller closed"),
            Self::MatchTimeout { skipped, last_sent } => write!(
                f,
                "no matching observation after skipping {skipped} stale observations (last action sent: {last_sent})"
            ),
            Self::InvalidState { operation } => {
                write!(f, "{operation} is invalid outside the running state")
            }
            Self::VersionMismatch { expected, got } => {
                write!(f, "protocol version mismatch: expected {expected}, got {got}")
            }
            Self::ConfigValidation { field, reason } => write!(f, "invalid {field}: {reason}"),
            Self::ConfigParse { source } => write!(f, "cannot parse config: {source}"),
        }
    }
}

/// Alias for `Result` with `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;
