//! Remote control and streaming core for a networked interactive simulator
//!
//! Drives an out-of-process simulator over two loopback TCP channels: a
//! fan-out action channel and a streaming observation channel. Supports
//! both a synchronous, RL-style step/reset loop ([`env::Environment`])
//! and free-running asynchronous use of [`controller::Controller`]
//! directly.
//!
//! Launching the simulator process, image display, and RL space-shaping
//! are left to consumers of this crate.

pub mod codec;
pub mod config;
pub mod constants;
pub mod controller;
pub mod env;
pub mod error;
pub mod latest_slot;
pub mod logging;
pub mod stats;
pub mod transport;

pub use codec::{ActionPacket, ObservationPacket};
pub use config::Settings;
pub use controller::Controller;
pub use env::Environment;
pub use error::{CoreError, Result};
pub use latest_slot::LatestSlot;
