//! Inbound (subscribe) transport: connects, blocking receive
//!
//! Connects with the same retry/backoff idiom the teacher uses for its
//! UDP socket setup, generalized to a TCP connect. `recv` blocks on a
//! short read timeout so a `close()` from another thread is noticed
//! promptly instead of leaving the caller parked in the kernel forever.

use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::constants::{MAX_CONNECT_RETRY_ATTEMPTS, POLL_INTERVAL_MS, RECONNECT_BASE_DELAY_MS};
use crate::error::{CoreError, Result};
use crate::transport::framing::read_frame;

/// Connects to the publisher and receives every message it sends, in order
pub struct ObservationTransport {
    stream: TcpStream,
    closed: AtomicBool,
}

impl ObservationTransport {
    /// Connect to `addr`, retrying with exponential backoff
    pub fn connect(addr: SocketAddr) -> Result<Self> {
        let mut last_err = None;
        for attempt in 0..MAX_CONNECT_RETRY_ATTEMPTS {
            match TcpStream::connect(addr) {
                Ok(stream) => {
                    stream.set_nodelay(true).ok();
                    stream
                        .set_read_timeout(Some(Duration::from_millis(POLL_INTERVAL_MS)))
                        .ok();
                    return Ok(Self { stream, closed: AtomicBool::new(false) });
                }
                Err(e) => {
                    last_err = Some(e);
                    if attempt + 1 < MAX_CONNECT_RETRY_ATTEMPTS {
                        std::thread::sleep(Duration::from_millis(
                            RECONNECT_BASE_DELAY_MS * (1 << attempt),
                        ));
                    }
                }
            }
        }
        Err(CoreError::ObservationConnect {
            addr,
            source: last_err.expect("at least one connect attempt was made"),
        })
    }

    /// Block until one complete frame arrives, or the transport is closed
    pub fn recv(&self) -> Result<Vec<u8>> {
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Err(CoreError::TransportClosed);
            }
            match read_frame(&mut &self.stream) {
                Ok(Some(payload)) => return Ok(payload),
                Ok(None) => return Err(CoreError::TransportClosed),
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(_) => return Err(CoreError::TransportClosed),
            }
        }
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
    }
}

impl Drop for ObservationTransport {
    fn drop(&mut self) {
        self.close();
    }
}
