//! Thin step/reset wrapper intended to seed RL-style loops
//!
//! Stateless beyond its `Controller` and an optional display sink,
//! grounded on `original_source/mcio_remote/network.py`'s `Gym` class —
//! generalized here from a hardcoded OpenCV window into an injectable
//! callback.

use crate::codec::{ActionPacket, ObservationPacket};
use crate::controller::Controller;
use crate::error::Result;

/// Callback invoked with each observation as it is returned to the caller
pub type DisplaySink = Box<dyn FnMut(&ObservationPacket) + Send>;

/// `reset`/`step`/`close` wrapper around a `Controller`
pub struct Environment {
    controller: Controller,
    display: Option<DisplaySink>,
}

impl Environment {
    pub fn new(controller: Controller) -> Self {
        Self { controller, display: None }
    }

    /// Attach a sink invoked with every observation returned from
    /// `reset`/`step` (e.g. to render a preview window).
    pub fn with_display(mut self, sink: DisplaySink) -> Self {
        self.display = Some(sink);
        self
    }

    /// Release all held input and run `commands`, returning the first
    /// observation that reflects them.
    pub fn reset(&mut self, commands: Vec<String>) -> Result<ObservationPacket> {
        let action = ActionPacket { clear_input: true, commands, ..ActionPacket::default() };
        let obs = self.controller.send_and_recv_match(action)?;
        self.notify(&obs);
        Ok(obs)
    }

    /// Dispatch `action` and return the first observation that reflects it.
    pub fn step(&mut self, action: ActionPacket) -> Result<ObservationPacket> {
        let obs = self.controller.send_and_recv_match(action)?;
        self.notify(&obs);
        Ok(obs)
    }

    pub fn close(&mut self) {
        self.controller.shutdown();
    }

    fn notify(&mut self, obs: &ObservationPacket) {
        if let Some(sink) = self.display.as_mut() {
            sink(obs);
        }
    }
}
