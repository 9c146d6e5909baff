#![forbid(unsafe_code)]

//! Fixed, ordered composition of child controls.

use std::rc::Rc;

use tracing::error;
use weave_core::HostNode;

use crate::boundary::BoundaryArena;
use crate::context::{BoxedControl, ViewContext, control_fn};

/// A control rendering `controls` side by side, in the given order.
///
/// Each child gets its own boundary in a chain over the parent view and
/// shares the parent's lifecycle and scheduler. No keys are involved: the
/// set and order of children never change.
pub fn compose_view_control<N: HostNode>(controls: Vec<BoxedControl<N>>) -> BoxedControl<N> {
    control_fn(move |cx: ViewContext<N>| {
        let arena = BoundaryArena::new(Rc::clone(cx.view()));
        for control in controls {
            let id = arena.create();
            if let Err(err) = arena.link_before(id, None) {
                error!(error = %err, "could not link composed child");
                continue;
            }
            control.init(cx.with_view(Rc::new(arena.view(id))));
        }
    })
}
