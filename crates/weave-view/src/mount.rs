#![forbid(unsafe_code)]

//! Mounting controls into host views.
//!
//! Both [`render_control`] and [`portal_control`] wrap the host view in a
//! standalone boundary, so rendered content never disturbs nodes the host
//! already holds.
//!
//! | Control | Scheduler | Content appears | On detach |
//! |---------|-----------|-----------------|-----------|
//! | render | own, else inherited | as the child schedules it | left to the child |
//! | portal | inherited | one flush later | boundary cleared by a `mutate` task |

use std::fmt;
use std::rc::Rc;

use weave_core::{HostNode, Lifecycle, View};
use weave_runtime::Scheduler;

use crate::boundary::BoundaryView;
use crate::context::{BoxedControl, Control, ViewContext, control_fn};
use crate::tasks;

/// A control that can start a tree: it needs no parent view.
pub trait RootControl {
    fn mount(self: Box<Self>, lifecycle: Lifecycle, scheduler: Scheduler);
}

/// Control returned by [`render_control`].
pub struct RenderControl<N: HostNode> {
    host: Rc<dyn View<N>>,
    control: BoxedControl<N>,
    scheduler: Option<Scheduler>,
}

impl<N: HostNode> fmt::Debug for RenderControl<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderControl")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

/// Render `control` into `host`.
pub fn render_control<N: HostNode>(host: Rc<dyn View<N>>, control: BoxedControl<N>) -> RenderControl<N> {
    RenderControl {
        host,
        control,
        scheduler: None,
    }
}

impl<N: HostNode> RenderControl<N> {
    /// Use `scheduler` instead of the one inherited from the parent context.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    #[must_use]
    pub fn boxed(self) -> BoxedControl<N> {
        Box::new(self)
    }

    fn render(self, lifecycle: Lifecycle, inherited: Scheduler) {
        let scheduler = self.scheduler.unwrap_or(inherited);
        let view = BoundaryView::standalone(self.host);
        self.control
            .init(ViewContext::new(lifecycle, scheduler, Rc::new(view)));
    }
}

impl<N: HostNode> Control<N> for RenderControl<N> {
    fn init(self: Box<Self>, cx: ViewContext<N>) {
        self.render(cx.lifecycle().clone(), cx.scheduler().clone());
    }
}

impl<N: HostNode> RootControl for RenderControl<N> {
    fn mount(self: Box<Self>, lifecycle: Lifecycle, scheduler: Scheduler) {
        self.render(lifecycle, scheduler);
    }
}

/// Render `control` into `host` once the next flush has run, and clear it
/// again when the portal detaches.
///
/// The deferral lets `host` be a view that the current flush is still
/// putting into the tree.
pub fn portal_control<N: HostNode>(host: Rc<dyn View<N>>, control: BoxedControl<N>) -> BoxedControl<N> {
    control_fn(move |cx: ViewContext<N>| {
        let scheduler = cx.scheduler().clone();
        let lifecycle = cx.lifecycle().clone();
        cx.scheduler().on_next_flush(move || {
            if lifecycle.is_fired() {
                return;
            }
            let view = BoundaryView::standalone(host);
            control.init(ViewContext::new(
                lifecycle.clone(),
                scheduler.clone(),
                Rc::new(view.clone()),
            ));
            lifecycle.on_detach(move || {
                scheduler.schedule(tasks::clear_view(view.arena(), view.id()));
            });
        });
    })
}
