//! ActionPump, ObservationPump, and StatsLogger worker-thread bodies
//!
//! Each pump is a single-threaded loop owning exclusive access to one
//! transport direction, per §5's "only ActionPump sends, only
//! ObservationPump receives" rule.

use std::sync::atomic::Ordering;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::codec::{ActionPacket, Codec, DecodeError};
use crate::latest_slot::LatestSlot;
use crate::stats::Stats;
use crate::transport::{ActionTransport, ObservationTransport};

use super::state::{State, StateCell};

/// Message the Controller enqueues for the ActionPump
pub enum ActionMsg {
    Send(ActionPacket),
    Shutdown,
}

pub fn action_pump(
    rx: Receiver<ActionMsg>,
    transport: Arc<ActionTransport>,
    codec: Arc<dyn Codec>,
    stats: Arc<Stats>,
) {
    for msg in rx {
        match msg {
            ActionMsg::Send(action) => {
                let bytes = codec.encode_action(&action);
                let len = bytes.len();
                match transport.send(&bytes) {
                    Ok(()) => stats.add_tx(len),
                    Err(e) => {
                        error!(error = %e, "action transport send failed, pump exiting");
                        return;
                    }
                }
            }
            ActionMsg::Shutdown => return,
        }
    }
}

pub struct ObservationPumpContext {
    pub transport: Arc<ObservationTransport>,
    pub codec: Arc<dyn Codec>,
    pub slot: Arc<LatestSlot<crate::codec::ObservationPacket>>,
    pub stats: Arc<Stats>,
    pub state: Arc<StateCell>,
    pub obs_seq_last_received: Arc<std::sync::atomic::AtomicU64>,
    pub fatal: Arc<std::sync::Mutex<Option<(u32, u32)>>>,
}

pub fn observation_pump(ctx: ObservationPumpContext) {
    let mut seen_first = false;

    loop {
        let bytes = match ctx.transport.recv() {
            Ok(bytes) => bytes,
            Err(_) => {
                debug!("observation transport closed, pump exiting");
                ctx.state.set(State::ShuttingDown);
                ctx.slot.close();
                return;
            }
        };
        ctx.stats.add_rx(bytes.len());

        let packet = match ctx.codec.decode_observation(&bytes) {
            Ok(packet) => packet,
            Err(DecodeError::VersionMismatch { expected, got }) => {
                error!(expected, got, "observation protocol version mismatch, shutting down");
                *ctx.fatal.lock().expect("fatal mutex poisoned") = Some((expected, got));
                ctx.state.set(State::ShuttingDown);
                ctx.slot.close();
                return;
            }
            Err(e) => {
                warn!(error = %e, "dropping undecodable observation");
                continue;
            }
        };

        let prior = ctx.obs_seq_last_received.load(Ordering::Acquire);
        if seen_first {
            if packet.sequence > prior + 1 {
                let gap = packet.sequence - prior - 1;
                ctx.stats.add_dropped(gap);
                debug!(gap, "drop detected in observation stream");
            } else if packet.sequence <= prior {
                ctx.stats.add_simulator_restart();
                warn!(
                    prior,
                    new = packet.sequence,
                    "observation sequence regressed; inferring simulator restart"
                );
            }
        }
        seen_first = true;
        ctx.obs_seq_last_received.store(packet.sequence, Ordering::Release);

        if ctx.slot.put(packet) {
            ctx.stats.add_displaced();
        }
    }
}

/// Emits one structured throughput/sequencing event per `interval`, until
/// the Controller leaves the `Running` state. Mirrors the teacher's
/// `TrackPerSecond(log_time=10.0)` cadence, as a `tracing` event with
/// fields instead of a formatted line.
pub fn stats_logger(stats: Arc<Stats>, state: Arc<StateCell>, interval: Duration) {
    use crate::constants::POLL_INTERVAL_MS;

    let mut elapsed = Duration::ZERO;
    let tick = Duration::from_millis(POLL_INTERVAL_MS);

    while !matches!(state.get(), State::ShuttingDown | State::Closed) {
        std::thread::sleep(tick);
        elapsed += tick;
        if elapsed < interval {
            continue;
        }
        elapsed = Duration::ZERO;

        let (tx_rate, rx_rate) = stats.update_rates();
        info!(
            tx_bytes = stats.tx_bytes(),
            rx_bytes = stats.rx_bytes(),
            tx_rate,
            rx_rate,
            dropped = stats.dropped(),
            displaced = stats.displaced(),
            skipped = stats.skipped(),
            match_timeouts = stats.match_timeouts(),
            simulator_restarts = stats.simulator_restarts(),
            "traffic stats"
        );
    }
}
