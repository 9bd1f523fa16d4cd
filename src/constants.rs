//! Application-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

// =============================================================================
// Protocol
// =============================================================================

/// Protocol version stamped on every packet, fixed per build
pub const PROTOCOL_VERSION: u32 = 0;

// =============================================================================
// Network
// =============================================================================

/// Default port for the action (agent -> simulator) channel
pub const DEFAULT_ACTION_PORT: u16 = 4001; // 4ction

/// Default port for the observation (simulator -> agent) channel
pub const DEFAULT_OBSERVATION_PORT: u16 = 8001; // 8bservation

// =============================================================================
// Timing
// =============================================================================

/// Publish-socket settle interval after bind, before the first send is
/// guaranteed not to race the subscriber's connect (slow-joiner policy)
pub const SETTLE_DURATION_MS: u64 = 500;

/// Poll interval used by blocking recv loops to notice a shutdown signal
pub const POLL_INTERVAL_MS: u64 = 100;

/// Base delay between observation-channel connect retries (milliseconds)
pub const RECONNECT_BASE_DELAY_MS: u64 = 200;

/// Maximum connect retry attempts before giving up
pub const MAX_CONNECT_RETRY_ATTEMPTS: u32 = 5;

/// Minimum interval between throughput rate recalculations (seconds)
pub const RATE_UPDATE_MIN_INTERVAL_SECS: f64 = 0.1;

/// Default interval between structured throughput log events (seconds)
pub const DEFAULT_STATS_LOG_INTERVAL_SECS: u64 = 10;

// =============================================================================
// Sequencing
// =============================================================================

/// Default bound on `send_and_recv_match`'s stale-observation skip loop
pub const DEFAULT_MATCH_SKIP_BUDGET: u32 = 256;

// =============================================================================
// Buffers
// =============================================================================

/// Maximum accepted frame length on the wire (guards against a corrupt
/// length prefix causing an unbounded allocation)
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// Backlog capacity for actions sent before a simulator has connected to
/// the action channel (the slow-joiner window). Bounded: this is a
/// best-effort bridge across connection setup, not a durable queue.
pub const ACTION_BACKLOG_CAPACITY: usize = 64;
