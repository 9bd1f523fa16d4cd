//! One-slot rendezvous with overwrite-on-put semantics
//!
//! A bounded queue of capacity 1: `put` always succeeds and reports
//! whether it discarded a pending value, `get` blocks for the next one.
//! Generalizes the teacher's overwrite-before-put queue pattern into a
//! first-class primitive with an explicit `displaced` signal, so a race
//! between a consumer emptying the slot and a producer refilling it can
//! never cause a silently-lost value (spec REDESIGN FLAGS item 3).

use parking_lot::{Condvar, Mutex};

struct Inner<T> {
    value: Option<T>,
    closed: bool,
}

/// Bounded-to-one rendezvous slot; the newest `put` always wins
pub struct LatestSlot<T> {
    inner: Mutex<Inner<T>>,
    condvar: Condvar,
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner { value: None, closed: false }),
            condvar: Condvar::new(),
        }
    }

    /// Store a value, overwriting and discarding any value already
    /// present. Returns `true` iff a prior value was discarded.
    pub fn put(&self, value: T) -> bool {
        let mut inner = self.inner.lock();
        let displaced = inner.value.replace(value).is_some();
        self.condvar.notify_one();
        displaced
    }

    /// Block until a value is available, then remove and return it.
    /// Returns `None` once the slot has been closed and no value remains.
    pub fn get(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(v) = inner.value.take() {
                return Some(v);
            }
            if inner.closed {
                return None;
            }
            self.condvar.wait(&mut inner);
        }
    }

    /// Non-blocking variant of `get`. `Ok(None)` means the slot is
    /// currently empty (but not closed); `Err(Closed)` means it has been
    /// closed and drained.
    pub fn try_get(&self) -> Result<Option<T>, Closed> {
        let mut inner = self.inner.lock();
        if let Some(v) = inner.value.take() {
            return Ok(Some(v));
        }
        if inner.closed {
            return Err(Closed);
        }
        Ok(None)
    }

    /// Wake any blocked `get` with a closed signal. Idempotent.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        self.condvar.notify_all();
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The slot was closed and has no value to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Closed;
