#![forbid(unsafe_code)]

//! Reference leaf controls for the in-memory host.
//!
//! These controls behave like real bindings: they never touch the tree
//! during `init` and route every write through the scheduler.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use weave_core::testing::MemNode;
use weave_render::{KeyedOrdering, SharedFactory};
use weave_runtime::{FnObserver, Subscribable, Task, TaskMetadata, until_detach};
use weave_view::{BoxedControl, ViewContext, control_fn};

/// Factory type used in orderings and change batches.
pub type MemFactory = SharedFactory<BoxedControl<MemNode>>;

/// One text node holding `label`.
///
/// Uses [`run_or_schedule`](weave_runtime::Scheduler::run_or_schedule), so a
/// text control initialised from a running `mutate` task writes at once.
pub fn text_control(label: impl Into<String>) -> BoxedControl<MemNode> {
    let label = label.into();
    control_fn(move |cx: ViewContext<MemNode>| {
        let view = Rc::clone(cx.view());
        let target = label.clone();
        cx.scheduler().run_or_schedule(
            Task::mutate(move || {
                view.write(MemNode::text(label))?;
                Ok(())
            })
            .with_metadata(TaskMetadata::new("write_text").with_target(target)),
        );
    })
}

/// Several text nodes, appended in order by one task.
pub fn nodes_control(labels: &[&str]) -> BoxedControl<MemNode> {
    let labels: Vec<String> = labels.iter().map(|label| (*label).to_owned()).collect();
    control_fn(move |cx: ViewContext<MemNode>| {
        let view = Rc::clone(cx.view());
        cx.schedule(
            Task::mutate(move || {
                for label in labels {
                    view.insert_before(MemNode::text(label), None)?;
                }
                Ok(())
            })
            .with_metadata(TaskMetadata::new("append_nodes")),
        );
    })
}

/// An element node whose children are rendered by `inner`.
pub fn element_control(label: impl Into<String>, inner: BoxedControl<MemNode>) -> BoxedControl<MemNode> {
    let label = label.into();
    control_fn(move |cx: ViewContext<MemNode>| {
        let element = MemNode::element(label);
        let view = Rc::clone(cx.view());
        let node = element.clone();
        cx.schedule(
            Task::mutate(move || {
                view.write(node)?;
                Ok(())
            })
            .with_metadata(TaskMetadata::new("write_element")),
        );
        inner.init(cx.with_view(Rc::new(element)));
    })
}

/// A text node rewritten with every value `source` pushes, until the
/// control detaches.
pub fn dynamic_text<S>(source: S) -> BoxedControl<MemNode>
where
    S: Subscribable<String> + 'static,
{
    control_fn(move |cx: ViewContext<MemNode>| {
        let view = Rc::clone(cx.view());
        let scheduler = cx.scheduler().clone();
        let observer = FnObserver::new(move |text: String| {
            let view = Rc::clone(&view);
            scheduler.schedule(
                Task::mutate(move || {
                    view.write(MemNode::text(text))?;
                    Ok(())
                })
                .with_metadata(TaskMetadata::new("write_dynamic_text")),
            );
        })
        .shared();
        until_detach(source, cx.lifecycle()).subscribe(observer);
    })
}

// ---------------------------------------------------------------------------
// Tracked controls
// ---------------------------------------------------------------------------

/// Shared, append-only record of control events.
#[derive(Clone, Default)]
pub struct EventLog {
    entries: Rc<RefCell<Vec<String>>>,
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.borrow().iter()).finish()
    }
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    /// Number of entries equal to `entry`.
    #[must_use]
    pub fn count(&self, entry: &str) -> usize {
        self.entries.borrow().iter().filter(|e| *e == entry).count()
    }

    #[must_use]
    pub fn contains(&self, entry: &str) -> bool {
        self.count(entry) > 0
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

/// A text control that records `init <name>` and `detach <name>`.
///
/// The detach entry is suffixed with ` (attached)` when the node is
/// still in the tree at the time the lifecycle fires.
pub fn tracked_control(name: impl Into<String>, log: &EventLog) -> BoxedControl<MemNode> {
    let name = name.into();
    let log = log.clone();
    control_fn(move |cx: ViewContext<MemNode>| {
        log.push(format!("init {name}"));
        let node = MemNode::text(name.clone());
        let view = Rc::clone(cx.view());
        let written = node.clone();
        cx.schedule(
            Task::mutate(move || {
                view.write(written)?;
                Ok(())
            })
            .with_metadata(TaskMetadata::new("write_tracked")),
        );
        cx.on_detach(move || {
            let suffix = if node.parent().is_some() { " (attached)" } else { "" };
            log.push(format!("detach {name}{suffix}"));
        });
    })
}

/// Factory of [`text_control`]s.
pub fn text_factory(label: impl Into<String>) -> MemFactory {
    let label = label.into();
    SharedFactory::new(move || text_control(label.clone()))
}

/// Factory of [`tracked_control`]s sharing `log`.
pub fn tracked_factory(name: impl Into<String>, log: &EventLog) -> MemFactory {
    let name = name.into();
    let log = log.clone();
    SharedFactory::new(move || tracked_control(name.clone(), &log))
}

/// An ordering of text controls labelled with their key.
pub fn text_ordering<K>(keys: &[K]) -> KeyedOrdering<K, MemFactory>
where
    K: Clone + fmt::Display,
{
    keys.iter()
        .map(|key| (key.clone(), text_factory(key.to_string())))
        .collect()
}

/// An ordering of tracked controls named after their key.
pub fn tracked_ordering<K>(keys: &[K], log: &EventLog) -> KeyedOrdering<K, MemFactory>
where
    K: Clone + fmt::Display,
{
    keys.iter()
        .map(|key| (key.clone(), tracked_factory(key.to_string(), log)))
        .collect()
}
