//! Controller: the concurrency and ordering brain
//!
//! Owns one `ActionTransport`, one `ObservationTransport`, one
//! `LatestSlot`, the two pump threads that move bytes between them and
//! the application, and a background stats logger. See `crate::env` for
//! the thin step/reset facade built on top of this.

mod pumps;
mod state;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use crate::codec::{ActionPacket, CborCodec, Codec, ObservationPacket};
use crate::config::Settings;
use crate::error::{CoreError, Result};
use crate::latest_slot::LatestSlot;
use crate::stats::Stats;
use crate::transport::{ActionTransport, ObservationTransport};

use pumps::{action_pump, observation_pump, stats_logger, ActionMsg, ObservationPumpContext};
use state::{State, StateCell};

/// Owns the two transports, the two pump threads, and all sequencing
/// state for one agent/simulator session
pub struct Controller {
    settings: Settings,
    state: Arc<StateCell>,
    action_tx: Mutex<Option<Sender<ActionMsg>>>,
    action_transport: Arc<ActionTransport>,
    observation_transport: Arc<ObservationTransport>,
    slot: Arc<LatestSlot<ObservationPacket>>,
    stats: Arc<Stats>,

    action_seq_next: AtomicU64,
    action_seq_last_queued: AtomicU64,
    obs_seq_last_processed: AtomicU64,
    obs_seq_last_received: Arc<AtomicU64>,
    resync_baseline: AtomicU64,

    action_pump_handle: Mutex<Option<JoinHandle<()>>>,
    observation_pump_handle: Mutex<Option<JoinHandle<()>>>,
    stats_logger_handle: Mutex<Option<JoinHandle<()>>>,

    /// Set by `ObservationPump` when it exits because of a
    /// `DecodeError::VersionMismatch`, so that error (rather than the
    /// generic `ControllerClosed`) reaches every blocked or future caller.
    fatal: Arc<Mutex<Option<(u32, u32)>>>,
}

impl Controller {
    /// Bind the action channel, connect the observation channel, settle,
    /// and start both pumps plus the stats logger. Returns with the
    /// Controller in `Running`.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let state = Arc::new(StateCell::new(State::Init));

        let action_addr = SocketAddr::new(settings.host, settings.action_port);
        let action_transport = Arc::new(ActionTransport::bind(action_addr)?);
        state.set(State::Bound);

        let observation_addr = SocketAddr::new(settings.host, settings.observation_port);
        let observation_transport = Arc::new(ObservationTransport::connect(observation_addr)?);

        info!(?action_addr, ?observation_addr, "transports ready, settling");
        std::thread::sleep(settings.settle());

        let codec: Arc<dyn Codec> = Arc::new(CborCodec::new());
        let slot = Arc::new(LatestSlot::new());
        let stats = Arc::new(Stats::new());
        let obs_seq_last_received = Arc::new(AtomicU64::new(0));
        let fatal = Arc::new(Mutex::new(None));

        let (action_tx, action_rx) = mpsc::channel::<ActionMsg>();

        let action_pump_handle = {
            let transport = action_transport.clone();
            let codec = codec.clone();
            let stats = stats.clone();
            std::thread::Builder::new()
                .name("action-pump".into())
                .spawn(move || action_pump(action_rx, transport, codec, stats))
                .expect("failed to spawn action-pump thread")
        };

        let observation_pump_handle = {
            let ctx = ObservationPumpContext {
                transport: observation_transport.clone(),
                codec: codec.clone(),
                slot: slot.clone(),
                stats: stats.clone(),
                state: state.clone(),
                obs_seq_last_received: obs_seq_last_received.clone(),
                fatal: fatal.clone(),
            };
            std::thread::Builder::new()
                .name("observation-pump".into())
                .spawn(move || observation_pump(ctx))
                .expect("failed to spawn observation-pump thread")
        };

        let stats_logger_handle = {
            let stats = stats.clone();
            let state = state.clone();
            let interval = settings.stats_log_interval();
            std::thread::Builder::new()
                .name("stats-logger".into())
                .spawn(move || stats_logger(stats, state, interval))
                .expect("failed to spawn stats-logger thread")
        };

        state.set(State::Running);
        info!("controller running");

        Ok(Self {
            settings,
            state,
            action_tx: Mutex::new(Some(action_tx)),
            action_transport,
            observation_transport,
            slot,
            stats,
            action_seq_next: AtomicU64::new(1),
            action_seq_last_queued: AtomicU64::new(0),
            obs_seq_last_processed: AtomicU64::new(0),
            obs_seq_last_received,
            resync_baseline: AtomicU64::new(0),
            action_pump_handle: Mutex::new(Some(action_pump_handle)),
            observation_pump_handle: Mutex::new(Some(observation_pump_handle)),
            stats_logger_handle: Mutex::new(Some(stats_logger_handle)),
            fatal,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    fn require_running(&self, operation: &'static str) -> Result<()> {
        if let Some(err) = self.check_fatal() {
            return Err(err);
        }
        if self.state.is_running() {
            Ok(())
        } else {
            Err(CoreError::InvalidState { operation })
        }
    }

    /// If `ObservationPump` shut down on a `VersionMismatch`, that's the
    /// error every caller should see, not the generic `ControllerClosed`.
    fn check_fatal(&self) -> Option<CoreError> {
        self.fatal
            .lock()
            .expect("fatal mutex poisoned")
            .map(|(expected, got)| CoreError::VersionMismatch { expected, got })
    }

    /// Stamp `action.sequence` and enqueue it. Never blocks.
    pub fn send_action(&self, mut action: ActionPacket) -> Result<u64> {
        self.require_running("send_action")?;

        let seq = self.action_seq_next.fetch_add(1, Ordering::AcqRel);
        action.sequence = seq;
        self.action_seq_last_queued.store(seq, Ordering::Release);

        let guard = self.action_tx.lock().expect("action_tx mutex poisoned");
        let tx = guard.as_ref().ok_or(CoreError::ControllerClosed)?;
        tx.send(ActionMsg::Send(action)).map_err(|_| CoreError::ControllerClosed)?;

        Ok(seq)
    }

    /// Block until the next observation arrives.
    pub fn recv_observation(&self) -> Result<ObservationPacket> {
        self.require_running("recv_observation")?;

        let packet = match self.slot.get() {
            Some(packet) => packet,
            None => return Err(self.check_fatal().unwrap_or(CoreError::ControllerClosed)),
        };

        self.obs_seq_last_processed.store(packet.sequence, Ordering::Release);
        Ok(packet)
    }

    /// Non-blocking poll for the next observation. `Ok(None)` means the
    /// Controller is healthy but no new observation has arrived since the
    /// last one was taken — a normal outcome for a polling caller, never
    /// a sign of shutdown. Only a genuinely closed Controller (or a fatal
    /// worker error) returns `Err`.
    pub fn try_recv_observation(&self) -> Result<Option<ObservationPacket>> {
        self.require_running("try_recv_observation")?;

        match self.slot.try_get() {
            Ok(Some(packet)) => {
                self.obs_seq_last_processed.store(packet.sequence, Ordering::Release);
                Ok(Some(packet))
            }
            Ok(None) => Ok(None),
            Err(_) => Err(self.check_fatal().unwrap_or(CoreError::ControllerClosed)),
        }
    }

    /// The synchronous step primitive: dispatch `action`, then consume
    /// observations until one reflects it, skipping stale ones up to the
    /// configured budget.
    pub fn send_and_recv_match(&self, action: ActionPacket) -> Result<ObservationPacket> {
        let seq = self.send_action(action)?;

        if !self.settings.match_sequences {
            return self.recv_observation();
        }

        let baseline = self.resync_baseline.load(Ordering::Acquire);
        let target = seq.saturating_sub(baseline);

        let mut skipped = 0u32;
        loop {
            let obs = self.recv_observation()?;
            if obs.last_action_sequence >= target {
                return Ok(obs);
            }

            skipped += 1;
            self.stats.add_skipped();
            debug!(
                sequence = seq,
                last_action_sequence = obs.last_action_sequence,
                skipped,
                "Skip-State"
            );

            if skipped >= self.settings.match_skip_budget {
                self.stats.add_match_timeout();
                return Err(CoreError::MatchTimeout { skipped, last_sent: seq });
            }
        }
    }

    /// After observing `MatchTimeout`, opt in to re-basing future match
    /// targets to count from the next sent action rather than this
    /// Controller's absolute sequence counter, so matching can succeed
    /// again once the simulator's own counter has reset after a restart.
    /// See DESIGN.md for why this is not automatic.
    pub fn resync_after_restart(&self) {
        let current_next = self.action_seq_next.load(Ordering::Acquire);
        self.resync_baseline.store(current_next.saturating_sub(1), Ordering::Release);
        warn!(baseline = current_next - 1, "resynced match baseline after simulator restart");
    }

    /// Signal both pumps to stop, close both transports, and join all
    /// three worker threads. Idempotent: a second (possibly concurrent)
    /// call is a no-op beyond joining threads a first caller may not have
    /// joined yet.
    pub fn shutdown(&self) {
        let already_shutting_down =
            matches!(self.state.get(), State::ShuttingDown | State::Closed);
        if !already_shutting_down {
            self.state.set(State::ShuttingDown);
            if let Some(tx) = self.action_tx.lock().expect("action_tx mutex poisoned").take() {
                let _ = tx.send(ActionMsg::Shutdown);
            }
            self.action_transport.close();
            self.observation_transport.close();
            self.slot.close();
        }

        if let Some(handle) =
            self.action_pump_handle.lock().expect("action_pump_handle mutex poisoned").take()
        {
            let _ = handle.join();
        }
        if let Some(handle) = self
            .observation_pump_handle
            .lock()
            .expect("observation_pump_handle mutex poisoned")
            .take()
        {
            let _ = handle.join();
        }
        if let Some(handle) = self
            .stats_logger_handle
            .lock()
            .expect("stats_logger_handle mutex poisoned")
            .take()
        {
            let _ = handle.join();
        }

        self.state.set(State::Closed);
        info!(
            tx_bytes = self.stats.tx_bytes(),
            rx_bytes = self.stats.rx_bytes(),
            dropped = self.stats.dropped(),
            "controller shut down"
        );
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown();
    }
}
