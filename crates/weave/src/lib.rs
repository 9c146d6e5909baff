#![forbid(unsafe_code)]

//! Weave public facade.
//!
//! # Role in Weave
//! `weave` is the main entry point for applications. It re-exports the
//! layer crates and offers a small [`prelude`] plus [`bootstrap`] for
//! mounting a root control.
//!
//! # Layers
//! - `core`: host-tree contracts and detach lifecycles.
//! - `runtime`: deferred task scheduler and push streams.
//! - `render`: keyed diffing.
//! - `view`: boundaries, keyed lists and controls.
//!
//! # Quick start
//!
//! ```ignore
//! use weave::prelude::*;
//!
//! let port = ManualFlushPort::new();
//! let orderings = Subject::new();
//! let app = bootstrap(
//!     render_control(host, keyed_view_control(orderings.clone())),
//!     Scheduler::new(port.clone()),
//! );
//! orderings.next(ordering);
//! port.pump();
//! app.terminate();
//! ```

pub mod app;

pub use app::{App, bootstrap};

pub use weave_core as core;
pub use weave_render as render;
pub use weave_runtime as runtime;
pub use weave_view as view;

#[cfg(feature = "harness")]
pub use weave_harness as harness;

pub use weave_core::{HostNode, Lifecycle, View, ViewError};
pub use weave_render::{KeyedOrdering, ViewChange, diff};
pub use weave_runtime::{Scheduler, SchedulerConfig, Task};
pub use weave_view::{BoxedControl, Control, ViewContext};

/// Everything an application typically needs.
pub mod prelude {
    pub use crate::app::{App, bootstrap};

    pub use weave_core::{DetachSubscription, HostNode, Lifecycle, View, ViewError, ViewResult};
    pub use weave_render::{
        ChildFactory, KeyedDiffer, KeyedOrdering, SharedFactory, ViewChange, diff,
    };
    pub use weave_runtime::{
        FlushPort, FnObserver, ManualFlushPort, Observer, QueueName, Scheduler, SchedulerConfig,
        StreamSubscription, Subject, Subscribable, Task, TaskMetadata, TaskResult, map_stream,
        until_detach,
    };
    pub use weave_view::{
        BoundaryView, BoxedControl, Control, IntoControl, ListError, RootControl, ViewContext,
        compose_view_control, control_fn, keyed_view_control, portal_control, render_control,
        view_control,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::rc::Rc;
    use weave_harness::{MemFactory, MemNode, text_ordering};

    #[test]
    fn prelude_is_enough_for_a_keyed_app() {
        let host = MemNode::element("list");
        let port = ManualFlushPort::new();
        let orderings: Subject<KeyedOrdering<&'static str, MemFactory>> = Subject::new();
        let app = bootstrap(
            render_control(Rc::new(host.clone()), keyed_view_control(orderings.clone())),
            Scheduler::new(port.clone()),
        );

        orderings.next(text_ordering(&["a", "b"]));
        port.pump_until_idle(8);
        assert_eq!(host.child_labels(), vec!["a", "b"]);

        orderings.next(text_ordering(&["b", "c"]));
        port.pump_until_idle(8);
        assert_eq!(host.child_labels(), vec!["b", "c"]);

        app.terminate();
        assert_eq!(orderings.observer_count(), 0);
    }
}
