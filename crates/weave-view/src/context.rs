#![forbid(unsafe_code)]

//! Control contract and the context handed to controls on init.
//!
//! A control takes over a region of the host tree when it is initialised
//! with a [`ViewContext`]: the view it may write into, the scheduler it
//! should route tree mutations through, and the lifecycle telling it when to
//! release what it acquired.
//!
//! Single-slot users need no separate context type: they keep at most one
//! node in the view and use [`View::write`] / [`View::remove`].

use std::fmt;
use std::rc::Rc;

use weave_core::{DetachSubscription, HostNode, Lifecycle, View};
use weave_render::{ChildFactory, SharedFactory};
use weave_runtime::{Scheduler, Task};

/// Everything a control needs to run.
pub struct ViewContext<N: HostNode> {
    lifecycle: Lifecycle,
    scheduler: Scheduler,
    view: Rc<dyn View<N>>,
}

impl<N: HostNode> Clone for ViewContext<N> {
    fn clone(&self) -> Self {
        Self {
            lifecycle: self.lifecycle.clone(),
            scheduler: self.scheduler.clone(),
            view: Rc::clone(&self.view),
        }
    }
}

impl<N: HostNode> fmt::Debug for ViewContext<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewContext")
            .field("lifecycle", &self.lifecycle)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl<N: HostNode> ViewContext<N> {
    pub fn new(lifecycle: Lifecycle, scheduler: Scheduler, view: Rc<dyn View<N>>) -> Self {
        Self {
            lifecycle,
            scheduler,
            view,
        }
    }

    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn view(&self) -> &Rc<dyn View<N>> {
        &self.view
    }

    /// Register a teardown handler on this context's lifecycle.
    pub fn on_detach(&self, handler: impl FnOnce() + 'static) -> DetachSubscription {
        self.lifecycle.on_detach(handler)
    }

    /// Queue a task on this context's scheduler.
    pub fn schedule(&self, task: Task) {
        self.scheduler.schedule(task);
    }

    /// Same lifecycle and scheduler, different view.
    #[must_use]
    pub fn with_view(&self, view: Rc<dyn View<N>>) -> Self {
        Self {
            lifecycle: self.lifecycle.clone(),
            scheduler: self.scheduler.clone(),
            view,
        }
    }

    /// Same view and scheduler, different lifecycle.
    #[must_use]
    pub fn with_lifecycle(&self, lifecycle: Lifecycle) -> Self {
        Self {
            lifecycle,
            scheduler: self.scheduler.clone(),
            view: Rc::clone(&self.view),
        }
    }

    /// Same view and lifecycle, different scheduler.
    #[must_use]
    pub fn with_scheduler(&self, scheduler: Scheduler) -> Self {
        Self {
            lifecycle: self.lifecycle.clone(),
            scheduler,
            view: Rc::clone(&self.view),
        }
    }
}

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

/// A unit of rendering that takes over a view when initialised.
///
/// `init` consumes the control: a control instance is rendered at most once.
/// Implementations may write to the view directly, but are expected to
/// route tree mutations through [`ViewContext::schedule`].
pub trait Control<N: HostNode> {
    fn init(self: Box<Self>, cx: ViewContext<N>);
}

/// Boxed, type-erased control.
pub type BoxedControl<N> = Box<dyn Control<N>>;

/// Control backed by a closure.
pub struct FnControl<F> {
    init: F,
}

impl<N: HostNode, F: FnOnce(ViewContext<N>)> Control<N> for FnControl<F> {
    fn init(self: Box<Self>, cx: ViewContext<N>) {
        (self.init)(cx);
    }
}

/// Box a closure as a control.
pub fn control_fn<N, F>(init: F) -> BoxedControl<N>
where
    N: HostNode,
    F: FnOnce(ViewContext<N>) + 'static,
{
    Box::new(FnControl { init })
}

/// Child payloads a view-change batch may carry.
///
/// Batches pushed through a multicast stream must be cloneable, which a
/// [`BoxedControl`] is not; a [`SharedFactory`] producing controls is, and
/// is realised when the insert is applied.
pub trait IntoControl<N: HostNode> {
    fn into_control(self) -> BoxedControl<N>;
}

impl<N: HostNode> IntoControl<N> for BoxedControl<N> {
    fn into_control(self) -> BoxedControl<N> {
        self
    }
}

impl<N: HostNode> IntoControl<N> for SharedFactory<BoxedControl<N>> {
    fn into_control(self) -> BoxedControl<N> {
        self.create()
    }
}
