//! Tracing setup
//!
//! Call [`init_tracing`] once, early in the host application, before
//! constructing a `Controller`. Everything downstream (pumps, `Stats`,
//! sequence-match skips) logs through `tracing` with structured fields —
//! counters emit events, not free-text lines.

/// Initialize a compact tracing subscriber for this crate's log output
///
/// Set `verbose` to enable debug-level output; otherwise only warnings
/// and above are shown. Safe to call more than once (later calls are a
/// no-op) so library consumers that already installed their own
/// subscriber are not overridden.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = if verbose { "debug" } else { "warn" };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(false)
                .compact(),
        )
        .with(tracing_subscriber::EnvFilter::new(level))
        .try_init();
}
