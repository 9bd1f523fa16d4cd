//! Outbound (publish) transport: binds, accepts one peer, lossy send
//!
//! A dedicated acceptor thread owns the `TcpListener` so a simulator
//! reconnecting after a restart is picked up transparently without the
//! `ActionPump` ever blocking on `accept`. Actions sent before any peer
//! has connected (the slow-joiner window around `Controller::new`'s
//! settle interval) are held in a small bounded backlog and replayed to
//! the first peer that connects, rather than dropped.

use std::collections::VecDeque;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::constants::ACTION_BACKLOG_CAPACITY;
use crate::error::{CoreError, Result};
use crate::transport::framing::write_frame;

/// Binds and publishes to whichever peer most recently connected
pub struct ActionTransport {
    addr: SocketAddr,
    peer: Arc<Mutex<Option<TcpStream>>>,
    pending: Arc<Mutex<VecDeque<Vec<u8>>>>,
    closed: Arc<AtomicBool>,
    acceptor: Mutex<Option<JoinHandle<()>>>,
}

impl ActionTransport {
    /// Bind `addr` and start accepting connections in the background
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .map_err(|source| CoreError::ActionBind { addr, source })?;
        // accept() must be interruptible at shutdown.
        listener
            .set_nonblocking(true)
            .map_err(|source| CoreError::ActionBind { addr, source })?;

        let peer = Arc::new(Mutex::new(None));
        let pending = Arc::new(Mutex::new(VecDeque::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let acceptor = {
            let peer = peer.clone();
            let pending = pending.clone();
            let closed = closed.clone();
            std::thread::Builder::new()
                .name("action-acceptor".into())
                .spawn(move || accept_loop(listener, peer, pending, closed))
                .expect("failed to spawn action-acceptor thread")
        };

        Ok(Self { addr, peer, pending, closed, acceptor: Mutex::new(Some(acceptor)) })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Send one frame to the currently attached peer, if any.
    ///
    /// If no peer is connected yet (slow-joiner, or the simulator has not
    /// yet reconnected after a restart), the payload is held in a bounded
    /// backlog and replayed to the next peer that connects instead of
    /// being dropped; once that backlog is full, the oldest entry is
    /// discarded to make room.
    pub fn send(&self, payload: &[u8]) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CoreError::TransportClosed);
        }
        let mut guard = self.peer.lock().expect("action peer mutex poisoned");
        match guard.as_mut() {
            Some(stream) if write_frame(stream, payload).is_ok() => {}
            Some(_) => {
                // Peer dropped mid-write; clear it and hold this frame
                // for whichever peer connects next.
                *guard = None;
                self.enqueue_pending(payload);
            }
            None => self.enqueue_pending(payload),
        }
        Ok(())
    }

    fn enqueue_pending(&self, payload: &[u8]) {
        let mut backlog = self.pending.lock().expect("action backlog mutex poisoned");
        if backlog.len() >= ACTION_BACKLOG_CAPACITY {
            backlog.pop_front();
        }
        backlog.push_back(payload.to_vec());
    }

    /// Stop accepting, drop any attached peer, and join the acceptor
    /// thread. Idempotent; safe to call through a shared `Arc`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        *self.peer.lock().expect("action peer mutex poisoned") = None;
        if let Some(handle) = self.acceptor.lock().expect("acceptor mutex poisoned").take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ActionTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn accept_loop(
    listener: TcpListener,
    peer: Arc<Mutex<Option<TcpStream>>>,
    pending: Arc<Mutex<VecDeque<Vec<u8>>>>,
    closed: Arc<AtomicBool>,
) {
    while !closed.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((mut stream, _)) => {
                let _ = stream.set_nodelay(true);
                {
                    let mut backlog = pending.lock().expect("action backlog mutex poisoned");
                    while let Some(payload) = backlog.pop_front() {
                        if write_frame(&mut stream, &payload).is_err() {
                            break;
                        }
                    }
                }
                *peer.lock().expect("action peer mutex poisoned") = Some(stream);
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(crate::constants::POLL_INTERVAL_MS));
            }
            Err(_) => {
                std::thread::sleep(Duration::from_millis(crate::constants::POLL_INTERVAL_MS));
            }
        }
    }
}
