#![forbid(unsafe_code)]

//! Keyed view control: orderings in, view changes out.

use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use weave_core::HostNode;
use weave_render::{ChildFactory, KeyedDiffer, KeyedOrdering, ViewChange};
use weave_runtime::{Subscribable, map_stream};

use crate::context::{BoxedControl, ViewContext, control_fn};
use crate::writer::ViewChangeWriter;

/// A control rendering the latest [`KeyedOrdering`] pushed by `source`.
///
/// Each instance diffs against the ordering it saw last; the first ordering
/// is diffed against an empty list.
pub fn keyed_view_control<K, N, F, S>(source: S) -> BoxedControl<N>
where
    K: Clone + Eq + Hash + fmt::Debug + 'static,
    N: HostNode,
    F: ChildFactory<BoxedControl<N>> + 'static,
    S: Subscribable<KeyedOrdering<K, F>> + 'static,
{
    control_fn(move |cx: ViewContext<N>| {
        let differ = Rc::new(RefCell::new(KeyedDiffer::new()));
        let batches = map_stream(
            source,
            move |ordering: KeyedOrdering<K, F>| -> Vec<ViewChange<K, BoxedControl<N>>> {
                differ.borrow_mut().next(ordering)
            },
        );
        ViewChangeWriter::new(cx).attach(&batches);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::testing::MemNode;
    use weave_core::{Lifecycle, View};
    use weave_render::SharedFactory;
    use weave_runtime::{ManualFlushPort, Scheduler, Subject, Task};

    type Factory = SharedFactory<BoxedControl<MemNode>>;

    fn text(label: &'static str) -> Factory {
        SharedFactory::new(move || {
            control_fn(move |cx: ViewContext<MemNode>| {
                let view = Rc::clone(cx.view());
                cx.schedule(Task::mutate(move || {
                    view.write(MemNode::text(label))?;
                    Ok(())
                }));
            })
        })
    }

    fn ordering(keys: &[&'static str]) -> KeyedOrdering<&'static str, Factory> {
        keys.iter().map(|key| (*key, text(key))).collect()
    }

    #[test]
    fn follows_successive_orderings() {
        let root = MemNode::element("root");
        let port = ManualFlushPort::new();
        let lifecycle = Lifecycle::new();
        let cx = ViewContext::new(
            lifecycle.clone(),
            Scheduler::new(port.clone()),
            Rc::new(root.clone()),
        );
        let orderings: Subject<KeyedOrdering<&'static str, Factory>> = Subject::new();
        keyed_view_control(orderings.clone()).init(cx);

        orderings.next(ordering(&["x", "y", "z"]));
        port.pump_until_idle(4);
        assert_eq!(root.child_labels(), vec!["x", "y", "z"]);

        orderings.next(ordering(&["y", "z", "w"]));
        port.pump_until_idle(4);
        assert_eq!(root.child_labels(), vec!["y", "z", "w"]);

        orderings.next(ordering(&["w", "y"]));
        port.pump_until_idle(4);
        assert_eq!(root.child_labels(), vec!["w", "y"]);

        lifecycle.fire();
        assert_eq!(orderings.observer_count(), 0);
    }

    #[test]
    fn empty_ordering_clears_the_view() {
        let root = MemNode::element("root");
        let port = ManualFlushPort::new();
        let cx = ViewContext::new(
            Lifecycle::new(),
            Scheduler::new(port.clone()),
            Rc::new(root.clone()),
        );
        let orderings: Subject<KeyedOrdering<&'static str, Factory>> = Subject::new();
        keyed_view_control(orderings.clone()).init(cx);

        orderings.next(ordering(&["a", "b"]));
        port.pump_until_idle(4);
        orderings.next(KeyedOrdering::new());
        port.pump_until_idle(4);
        assert!(root.child_labels().is_empty());
    }
}
