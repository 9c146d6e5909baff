#![forbid(unsafe_code)]

//! Flush trigger supplied by the host environment.
//!
//! The scheduler never picks a timing primitive itself. It asks a
//! [`FlushPort`] to run a callback "once, soon" and guarantees that at most
//! one request is outstanding at a time.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Callback handed to a port; running it flushes the scheduler.
pub type FlushCallback = Box<dyn FnOnce()>;

/// Requests a deferred flush from the host.
pub trait FlushPort {
    /// Arrange for `callback` to run once, after the current turn.
    fn request_flush(&self, callback: FlushCallback);
}

impl<F: Fn(FlushCallback)> FlushPort for F {
    fn request_flush(&self, callback: FlushCallback) {
        self(callback);
    }
}

/// A port driven explicitly by the host loop.
///
/// The pending callback is stored until [`pump`](Self::pump) is called,
/// typically once per frame. Clones share the same slot.
#[derive(Clone, Default)]
pub struct ManualFlushPort {
    pending: Rc<RefCell<Option<FlushCallback>>>,
    requests: Rc<Cell<u64>>,
}

impl fmt::Debug for ManualFlushPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualFlushPort")
            .field("pending", &self.is_pending())
            .field("requests", &self.requests())
            .finish()
    }
}

impl ManualFlushPort {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the pending callback, if any. Returns whether one ran.
    pub fn pump(&self) -> bool {
        let callback = self.pending.borrow_mut().take();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Pump until no callback is pending, up to `max_rounds` times.
    /// Returns the number of callbacks run.
    pub fn pump_until_idle(&self, max_rounds: usize) -> usize {
        let mut rounds = 0;
        while rounds < max_rounds && self.pump() {
            rounds += 1;
        }
        rounds
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }

    /// Total number of flush requests received.
    #[must_use]
    pub fn requests(&self) -> u64 {
        self.requests.get()
    }
}

impl FlushPort for ManualFlushPort {
    fn request_flush(&self, callback: FlushCallback) {
        let mut pending = self.pending.borrow_mut();
        debug_assert!(pending.is_none(), "flush requested twice before pump");
        *pending = Some(callback);
        self.requests.set(self.requests.get() + 1);
    }
}
