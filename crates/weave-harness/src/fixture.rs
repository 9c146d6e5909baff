#![forbid(unsafe_code)]

//! Deterministic mounting fixture.
//!
//! A [`Fixture`] owns an in-memory root element, a scheduler flushed through
//! a [`ManualFlushPort`], and the root lifecycle. Nothing reaches the tree
//! until the test calls [`Fixture::flush`].

use std::rc::Rc;

use weave_core::Lifecycle;
use weave_core::testing::MemNode;
use weave_runtime::{ManualFlushPort, Scheduler, SchedulerConfig};
use weave_view::{BoxedControl, ViewContext};

/// Upper bound on flush rounds in [`Fixture::flush`].
///
/// Default: 64.
pub const MAX_FLUSH_ROUNDS: usize = 64;

/// Root element, scheduler and lifecycle for one test.
pub struct Fixture {
    root: MemNode,
    port: ManualFlushPort,
    scheduler: Scheduler,
    lifecycle: Lifecycle,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    #[must_use]
    pub fn with_config(config: SchedulerConfig) -> Self {
        let port = ManualFlushPort::new();
        Self {
            root: MemNode::element("root"),
            scheduler: Scheduler::with_config(port.clone(), config),
            port,
            lifecycle: Lifecycle::new(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &MemNode {
        &self.root
    }

    #[must_use]
    pub fn port(&self) -> &ManualFlushPort {
        &self.port
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// A context over the root element.
    #[must_use]
    pub fn context(&self) -> ViewContext<MemNode> {
        ViewContext::new(
            self.lifecycle.clone(),
            self.scheduler.clone(),
            Rc::new(self.root.clone()),
        )
    }

    /// Initialise `control` against the root element.
    pub fn mount(&self, control: BoxedControl<MemNode>) {
        control.init(self.context());
    }

    /// Run flushes until the scheduler goes idle. Returns the number of
    /// flushes run.
    pub fn flush(&self) -> usize {
        self.port.pump_until_idle(MAX_FLUSH_ROUNDS)
    }

    /// Run exactly one pending flush, if any.
    pub fn flush_once(&self) -> bool {
        self.port.pump()
    }

    /// Fire the root lifecycle.
    pub fn detach(&self) {
        self.lifecycle.fire();
    }

    /// Labels of the root's children.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.root.child_labels()
    }

    /// The whole tree as `root[a,b[c]]`.
    #[must_use]
    pub fn render(&self) -> String {
        self.root.render()
    }
}
