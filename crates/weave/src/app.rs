#![forbid(unsafe_code)]

//! Application root.
//!
//! [`bootstrap`] mounts a [`RootControl`] under a fresh root [`Lifecycle`]
//! and hands back an [`App`]. Terminating the app fires that lifecycle,
//! which cascades into every writer, portal and stream subscription below
//! it.
//!
//! # Invariants
//!
//! 1. The root lifecycle fires at most once, however often
//!    [`App::terminate`] is called.
//! 2. A handler registered on [`App::lifecycle`] after termination runs
//!    immediately.

use std::fmt;

use weave_core::{DetachSubscription, Lifecycle};
use weave_runtime::Scheduler;
use weave_view::RootControl;

/// A mounted control tree.
pub struct App {
    lifecycle: Lifecycle,
    scheduler: Scheduler,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("terminated", &self.is_terminated())
            .field("pending_tasks", &self.scheduler.pending_tasks())
            .finish()
    }
}

/// Mount `control` with `scheduler` and return the running app.
///
/// Nothing reaches the host tree until the scheduler's port runs a flush.
pub fn bootstrap<R: RootControl + 'static>(control: R, scheduler: Scheduler) -> App {
    let lifecycle = Lifecycle::new();
    Box::new(control).mount(lifecycle.clone(), scheduler.clone());
    App {
        lifecycle,
        scheduler,
    }
}

impl App {
    /// Fire the root lifecycle. Idempotent.
    pub fn terminate(&self) {
        self.lifecycle.fire();
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.lifecycle.is_fired()
    }

    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Run `handler` when the app terminates, or now if it already has.
    pub fn on_terminate(&self, handler: impl FnOnce() + 'static) -> DetachSubscription {
        self.lifecycle.on_detach(handler)
    }
}
