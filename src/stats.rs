//! Traffic and sequencing statistics
//!
//! Thread-safe counters for throughput, drops, displacements, and skips.
//! All counters are lock-free atomics; rate calculation is debounced the
//! same way the teacher's bridge traffic counters are.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

/// Traffic and sequencing statistics for one Controller
pub struct Stats {
    /// Total bytes sent on the action channel
    tx_total: AtomicU64,
    /// Total bytes received on the observation channel
    rx_total: AtomicU64,
    tx_snapshot: AtomicU64,
    rx_snapshot: AtomicU64,
    start_time: Instant,
    last_calc_nanos: AtomicU64,
    tx_rate: AtomicU64,
    rx_rate: AtomicU64,

    /// Observations dropped (sequence gap detected by ObservationPump)
    dropped: AtomicU64,
    /// Observations displaced in `LatestSlot` before being consumed
    displaced: AtomicU64,
    /// Stale observations skipped by `send_and_recv_match`
    skipped: AtomicU64,
    /// Times `send_and_recv_match` exceeded its skip budget
    match_timeouts: AtomicU64,
    /// Times a simulator restart was inferred from a regressing
    /// `last_action_sequence`
    simulator_restarts: AtomicU32,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            tx_total: AtomicU64::new(0),
            rx_total: AtomicU64::new(0),
            tx_snapshot: AtomicU64::new(0),
            rx_snapshot: AtomicU64::new(0),
            start_time: Instant::now(),
            last_calc_nanos: AtomicU64::new(0),
            tx_rate: AtomicU64::new(0),
            rx_rate: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            displaced: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            match_timeouts: AtomicU64::new(0),
            simulator_restarts: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn add_tx(&self, bytes: usize) {
        self.tx_total.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_rx(&self, bytes: usize) {
        self.rx_total.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_dropped(&self, n: u64) {
        self.dropped.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_displaced(&self) {
        self.displaced.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_match_timeout(&self) {
        self.match_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_simulator_restart(&self) {
        self.simulator_restarts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn tx_bytes(&self) -> u64 {
        self.tx_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rx_bytes(&self) -> u64 {
        self.rx_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn displaced(&self) -> u64 {
        self.displaced.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn match_timeouts(&self) -> u64 {
        self.match_timeouts.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn simulator_restarts(&self) -> u32 {
        self.simulator_restarts.load(Ordering::Relaxed)
    }

    /// Update rate calculations and return (tx_bytes_per_sec, rx_bytes_per_sec)
    ///
    /// Debounced to at most once per `RATE_UPDATE_MIN_INTERVAL_SECS`;
    /// call this periodically from a timer, not the hot path.
    pub fn update_rates(&self) -> (f64, f64) {
        use crate::constants::RATE_UPDATE_MIN_INTERVAL_SECS;

        let now_nanos = self.start_time.elapsed().as_nanos() as u64;
        let last_nanos = self.last_calc_nanos.load(Ordering::Relaxed);
        let elapsed = (now_nanos - last_nanos) as f64 / 1_000_000_000.0;

        if elapsed < RATE_UPDATE_MIN_INTERVAL_SECS {
            return self.cached_rates();
        }

        if self
            .last_calc_nanos
            .compare_exchange(last_nanos, now_nanos, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            return self.cached_rates();
        }

        let tx_now = self.tx_total.load(Ordering::Relaxed);
        let rx_now = self.rx_total.load(Ordering::Relaxed);
        let tx_prev = self.tx_snapshot.swap(tx_now, Ordering::Relaxed);
        let rx_prev = self.rx_snapshot.swap(rx_now, Ordering::Relaxed);

        let tx_rate = (tx_now - tx_prev) as f64 / elapsed;
        let rx_rate = (rx_now - rx_prev) as f64 / elapsed;

        self.tx_rate.store(tx_rate.to_bits(), Ordering::Relaxed);
        self.rx_rate.store(rx_rate.to_bits(), Ordering::Relaxed);

        (tx_rate, rx_rate)
    }

    fn cached_rates(&self) -> (f64, f64) {
        (
            f64::from_bits(self.tx_rate.load(Ordering::Relaxed)),
            f64::from_bits(self.rx_rate.load(Ordering::Relaxed)),
        )
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}
