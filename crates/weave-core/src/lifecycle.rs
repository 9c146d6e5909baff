#![forbid(unsafe_code)]

//! Exactly-once detach notification.
//!
//! A [`Lifecycle`] is created per unit that can be torn down on its own (a
//! list item, a portal, the application root). Cleanup code registers with
//! [`Lifecycle::on_detach`]; [`Lifecycle::fire`] runs every registered handler
//! once and moves the context to the fired state for good.
//!
//! # State machine
//!
//! ```text
//!   Active(handlers) --fire()--> Fired
//! ```
//!
//! # Invariants
//!
//! 1. Every handler runs at most once.
//! 2. Handlers run in registration order.
//! 3. A handler registered after firing runs immediately, synchronously.
//! 4. A handler registered while firing is in progress runs in that firing.
//! 5. A handler unsubscribed before it runs never runs.
//! 6. `is_fired()` becomes `true` only after the last handler has returned.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | `fire()` called twice | Second call is a no-op |
//! | `fire()` called from a handler | No-op for the caller; the outer drain continues |
//! | `unsubscribe()` after firing | No-op |
//! | Handler panics | Remaining handlers still run and the context fires; the first panic then resumes in the caller of `fire()` |

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

type Handler = Box<dyn FnOnce()>;

enum State {
    Active(VecDeque<(u64, Handler)>),
    Fired,
}

struct LifecycleInner {
    state: RefCell<State>,
    next_id: Cell<u64>,
    firing: Cell<bool>,
}

/// Shared, cloneable detach context.
///
/// Clones refer to the same context: firing any clone fires them all.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Rc<LifecycleInner>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("fired", &self.is_fired())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl Lifecycle {
    /// Create an active context with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(LifecycleInner {
                state: RefCell::new(State::Active(VecDeque::new())),
                next_id: Cell::new(0),
                firing: Cell::new(false),
            }),
        }
    }

    /// Register a cleanup handler.
    ///
    /// If the context has already fired the handler runs right away and the
    /// returned subscription is inert.
    pub fn on_detach(&self, handler: impl FnOnce() + 'static) -> DetachSubscription {
        {
            let mut state = self.inner.state.borrow_mut();
            if let State::Active(handlers) = &mut *state {
                let id = self.inner.next_id.get();
                self.inner.next_id.set(id + 1);
                handlers.push_back((id, Box::new(handler)));
                return DetachSubscription {
                    inner: Rc::downgrade(&self.inner),
                    id: Some(id),
                };
            }
        }
        handler();
        DetachSubscription::inert()
    }

    /// Register a handler that is withdrawn automatically when `signal` fires.
    ///
    /// If `signal` has already fired nothing is registered. Once the handler
    /// runs, its withdrawal hook is removed from `signal`.
    pub fn on_detach_until(
        &self,
        handler: impl FnOnce() + 'static,
        signal: &Lifecycle,
    ) -> DetachSubscription {
        if signal.is_fired() {
            return DetachSubscription::inert();
        }
        let back_link = Rc::new(RefCell::new(DetachSubscription::inert()));
        let release = Rc::clone(&back_link);
        let subscription = self.on_detach(move || {
            release.borrow().unsubscribe();
            handler();
        });
        let withdraw = subscription.clone();
        *back_link.borrow_mut() = signal.on_detach(move || withdraw.unsubscribe());
        subscription
    }

    /// Run every registered handler once, then enter the fired state.
    pub fn fire(&self) {
        if self.inner.firing.get() || self.is_fired() {
            return;
        }
        self.inner.firing.set(true);
        let mut ran = 0usize;
        let mut first_panic = None;
        loop {
            let next = match &mut *self.inner.state.borrow_mut() {
                State::Active(handlers) => handlers.pop_front(),
                State::Fired => None,
            };
            let Some((_, handler)) = next else {
                break;
            };
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(handler)) {
                first_panic.get_or_insert(payload);
            }
            ran += 1;
        }
        *self.inner.state.borrow_mut() = State::Fired;
        self.inner.firing.set(false);

        #[cfg(feature = "tracing")]
        tracing::trace!(handlers = ran, "lifecycle fired");
        #[cfg(not(feature = "tracing"))]
        let _ = ran;

        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }
    }

    /// Whether [`fire`](Self::fire) has completed.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        matches!(*self.inner.state.borrow(), State::Fired)
    }

    /// Number of handlers still waiting to run.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        match &*self.inner.state.borrow() {
            State::Active(handlers) => handlers.len(),
            State::Fired => 0,
        }
    }

    /// Create a context that fires when this one fires.
    ///
    /// The child can also be fired on its own, which drops its cascade
    /// handler from the parent. The parent only holds a weak reference to it.
    #[must_use]
    pub fn child(&self) -> Lifecycle {
        let child = Lifecycle::new();
        let weak = Rc::downgrade(&child.inner);
        let cascade = self.on_detach(move || {
            if let Some(inner) = weak.upgrade() {
                Lifecycle { inner }.fire();
            }
        });
        child.on_detach(move || cascade.unsubscribe());
        child
    }

    /// Whether two handles refer to the same context.
    #[must_use]
    pub fn ptr_eq(&self, other: &Lifecycle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Handle returned by [`Lifecycle::on_detach`].
///
/// Dropping it does not unsubscribe; call [`unsubscribe`](Self::unsubscribe).
#[derive(Clone)]
pub struct DetachSubscription {
    inner: Weak<LifecycleInner>,
    id: Option<u64>,
}

impl fmt::Debug for DetachSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetachSubscription")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

impl DetachSubscription {
    /// A subscription that refers to nothing.
    #[must_use]
    pub fn inert() -> Self {
        Self {
            inner: Weak::new(),
            id: None,
        }
    }

    /// Remove the handler if it has not run yet.
    pub fn unsubscribe(&self) {
        let Some(id) = self.id else {
            return;
        };
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        if let State::Active(handlers) = &mut *inner.state.borrow_mut() {
            handlers.retain(|(handler_id, _)| *handler_id != id);
        }
    }

    /// Whether the handler is still waiting to run.
    #[must_use]
    pub fn is_live(&self) -> bool {
        let Some(id) = self.id else {
            return false;
        };
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        match &*inner.state.borrow() {
            State::Active(handlers) => handlers.iter().any(|(handler_id, _)| *handler_id == id),
            State::Fired => false,
        }
    }
}
