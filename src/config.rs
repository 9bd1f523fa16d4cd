//! Configuration for the Controller
//!
//! Settings are plain data: construct with `Settings::default()` (the
//! embedded `config/default.toml` baseline) or parse an override document
//! with [`Settings::from_toml`]. `Controller::new` validates the result.

use crate::constants::{
    DEFAULT_ACTION_PORT, DEFAULT_MATCH_SKIP_BUDGET, DEFAULT_OBSERVATION_PORT,
    DEFAULT_STATS_LOG_INTERVAL_SECS, SETTLE_DURATION_MS,
};
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../config/default.toml");

/// Controller configuration
///
/// Non-goals bind this struct too: `host` must be a loopback address
/// (remote operation is explicitly out of scope).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Loopback address both channels bind/connect on
    pub host: IpAddr,
    /// Port the action (publish) channel binds on
    pub action_port: u16,
    /// Port the observation (subscribe) channel connects to
    pub observation_port: u16,
    /// Toggles the sync-match loop in `send_and_recv_match`
    pub match_sequences: bool,
    /// Bound on stale-observation skips before `MatchTimeout`
    pub match_skip_budget: u32,
    /// Publish-socket settle interval in milliseconds (slow-joiner policy)
    pub settle_ms: u64,
    /// Interval between structured throughput log events, in seconds
    pub stats_log_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        // The embedded document is committed alongside this source and
        // known-valid; a failure here is a build-time bug, not a runtime
        // condition callers need to handle.
        toml::from_str(DEFAULT_SETTINGS_TOML).expect("config/default.toml is valid")
    }
}

impl Settings {
    /// Parse a settings document, falling back to defaults for any field
    /// the document omits
    pub fn from_toml(document: &str) -> Result<Self> {
        toml::from_str(document).map_err(|source| CoreError::ConfigParse { source })
    }

    /// Validate field values that can't be enforced by the type system
    /// alone (e.g. the loopback-only Non-goal).
    pub fn validate(&self) -> Result<()> {
        if !self.host.is_loopback() {
            return Err(CoreError::ConfigValidation {
                field: "host",
                reason: format!("{} is not a loopback address (remote operation is out of scope)", self.host),
            });
        }
        if self.match_skip_budget == 0 {
            return Err(CoreError::ConfigValidation {
                field: "match_skip_budget",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn stats_log_interval(&self) -> Duration {
        Duration::from_secs(self.stats_log_interval_secs)
    }
}
