#![forbid(unsafe_code)]

//! View change writer.
//!
//! [`ViewChangeWriter`] applies batches of [`ViewChange`] commands to a
//! [`BoundaryList`] built over its context's view. The list's chain is
//! updated as each command is applied; moving and removing host nodes is
//! deferred to `mutate` tasks.
//!
//! | Command | At apply time | Deferred task |
//! |---------|---------------|---------------|
//! | Insert | link a fresh record, create a child lifecycle, init the child | settle pass |
//! | Move | relink the record | settle pass |
//! | Remove | retire the key, fire the child lifecycle | clear the nodes, drop the record |
//!
//! A settle pass moves the nodes of every relinked record to match the
//! chain. At most one is outstanding per writer. Deferred tasks go through
//! [`run_or_schedule`](weave_runtime::Scheduler::run_or_schedule), so a batch
//! applied from inside a `mutate` task lands in the same flush.
//!
//! # Invariants
//!
//! 1. After each command, the list's linked order matches the logical order
//!    of the batches applied so far. A child writing during `init` writes
//!    in its final position relative to the settled part of the list.
//! 2. A removed child's lifecycle fires before its nodes leave the tree.
//! 3. On shutdown every tracked child lifecycle fires exactly once and the
//!    source subscription is released exactly once.
//! 4. A closed writer ignores every later batch.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Unknown key or reference in [`apply`](ViewChangeWriter::apply) | [`ListError`] returned, rest of the batch skipped |
//! | Same fault while driven by a stream | Logged at `error!`, writer shuts down |
//! | Deferred task fails | Logged by the scheduler |

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::mem;
use std::rc::Rc;

use ahash::AHashMap;
use tracing::{debug, error, trace, warn};
use weave_core::{DetachSubscription, HostNode, Lifecycle};
use weave_render::ViewChange;
use weave_runtime::{Observer, StreamSubscription, Subscribable};

use crate::boundary::BoundaryView;
use crate::context::{BoxedControl, IntoControl, ViewContext, control_fn};
use crate::list::{BoundaryList, ListError};
use crate::tasks;

struct WriterInner<K, N: HostNode> {
    cx: ViewContext<N>,
    list: RefCell<BoundaryList<K, N>>,
    children: RefCell<AHashMap<K, Lifecycle>>,
    settle_requested: Rc<Cell<bool>>,
    closed: Cell<bool>,
    source: RefCell<Option<StreamSubscription>>,
    detach: RefCell<Option<DetachSubscription>>,
}

/// Applies view-change batches to the children of one view.
///
/// Clones share the same writer.
pub struct ViewChangeWriter<K, N: HostNode> {
    inner: Rc<WriterInner<K, N>>,
}

impl<K, N: HostNode> Clone for ViewChangeWriter<K, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K: fmt::Debug, N: HostNode> fmt::Debug for ViewChangeWriter<K, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewChangeWriter")
            .field("children", &self.inner.children.borrow().len())
            .field("closed", &self.inner.closed.get())
            .finish()
    }
}

impl<K, N> ViewChangeWriter<K, N>
where
    K: Clone + Eq + Hash + fmt::Debug + 'static,
    N: HostNode,
{
    /// A writer managing children of `cx.view()`.
    pub fn new(cx: ViewContext<N>) -> Self {
        let list = BoundaryList::new(Rc::clone(cx.view()));
        Self {
            inner: Rc::new(WriterInner {
                cx,
                list: RefCell::new(list),
                children: RefCell::new(AHashMap::new()),
                settle_requested: Rc::default(),
                closed: Cell::new(false),
                source: RefCell::new(None),
                detach: RefCell::new(None),
            }),
        }
    }

    #[must_use]
    pub fn context(&self) -> &ViewContext<N> {
        &self.inner.cx
    }

    /// Apply one batch, in order.
    ///
    /// Stops at the first integrity fault; commands before it stay applied.
    pub fn apply<C: IntoControl<N>>(&self, batch: Vec<ViewChange<K, C>>) -> Result<(), ListError> {
        if self.inner.closed.get() {
            trace!(changes = batch.len(), "view change writer closed; batch ignored");
            return Ok(());
        }
        debug!(changes = batch.len(), "applying view changes");
        let outcome = batch.into_iter().try_for_each(|change| match change {
            ViewChange::Insert {
                key,
                ref_key,
                child,
            } => self.insert(key, ref_key.as_ref(), child.into_control()),
            ViewChange::Move { key, ref_key } => self.relocate(&key, ref_key.as_ref()),
            ViewChange::Remove { key } => self.remove(&key),
        });
        self.request_settle();
        outcome
    }

    fn insert(&self, key: K, ref_key: Option<&K>, control: BoxedControl<N>) -> Result<(), ListError> {
        let (arena, id) = {
            let mut list = self.inner.list.borrow_mut();
            let before = list.resolve_before(ref_key)?;
            let id = list.reserve(key.clone())?;
            if let Err(err) = list.arena().relink(id, before) {
                if list.retire(&key).is_ok() {
                    list.arena().discard(id);
                }
                return Err(err.into());
            }
            (list.arena().clone(), id)
        };

        let lifecycle = Lifecycle::new();
        self.inner
            .children
            .borrow_mut()
            .insert(key, lifecycle.clone());
        let child_cx = ViewContext::new(
            lifecycle,
            self.inner.cx.scheduler().clone(),
            Rc::new(arena.view(id)),
        );
        control.init(child_cx);
        Ok(())
    }

    fn relocate(&self, key: &K, ref_key: Option<&K>) -> Result<(), ListError> {
        if ref_key == Some(key) {
            return Ok(());
        }
        let list = self.inner.list.borrow();
        let id = list.resolve(key)?;
        let before = list.resolve_before(ref_key)?;
        list.arena().relink(id, before)?;
        Ok(())
    }

    /// Make sure a settle pass will run for records relinked so far.
    fn request_settle(&self) {
        let arena = self.inner.list.borrow().arena().clone();
        if !arena.has_unsettled() || self.inner.settle_requested.replace(true) {
            return;
        }
        let task = tasks::settle_view_children(&arena, Rc::clone(&self.inner.settle_requested));
        self.inner.cx.scheduler().run_or_schedule(task);
    }

    fn remove(&self, key: &K) -> Result<(), ListError> {
        let (arena, id) = {
            let mut list = self.inner.list.borrow_mut();
            let id = list.retire(key)?;
            (list.arena().clone(), id)
        };
        let lifecycle = self.inner.children.borrow_mut().remove(key);
        if let Some(lifecycle) = lifecycle {
            lifecycle.fire();
        }
        self.inner
            .cx
            .scheduler()
            .run_or_schedule(tasks::remove_view_child(&arena, id, format!("{key:?}")));
        Ok(())
    }

    /// Subscribe to `source` and apply every batch it pushes.
    ///
    /// The subscription is released when the source completes, when a batch
    /// is rejected, or when the context's lifecycle fires, whichever comes
    /// first.
    pub fn attach<S, C>(&self, source: &S)
    where
        S: Subscribable<Vec<ViewChange<K, C>>> + ?Sized,
        C: IntoControl<N> + 'static,
    {
        if self.inner.closed.get() {
            return;
        }
        if self.inner.source.borrow().is_some() {
            warn!("view change writer already attached; second source ignored");
            return;
        }
        let observer: Rc<dyn Observer<Vec<ViewChange<K, C>>>> = Rc::new(BatchObserver {
            writer: self.clone(),
            _child: PhantomData,
        });
        let subscription = source.subscribe(observer);
        if self.inner.closed.get() {
            subscription.unsubscribe();
            return;
        }
        *self.inner.source.borrow_mut() = Some(subscription);

        let writer = self.clone();
        let detach = self.inner.cx.on_detach(move || writer.shutdown());
        if !self.inner.closed.get() {
            *self.inner.detach.borrow_mut() = Some(detach);
        }
    }

    /// Fire every child lifecycle, release the source and ignore further
    /// batches. Idempotent.
    pub fn shutdown(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        let source = self.inner.source.borrow_mut().take();
        if let Some(source) = source {
            source.unsubscribe();
        }
        let detach = self.inner.detach.borrow_mut().take();
        if let Some(detach) = detach {
            detach.unsubscribe();
        }
        let children = mem::take(&mut *self.inner.children.borrow_mut());
        debug!(children = children.len(), "view change writer shut down");
        for lifecycle in children.into_values() {
            lifecycle.fire();
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    /// Number of tracked children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.children.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of live children in logical order.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.inner.list.borrow().keys_in_order()
    }

    #[must_use]
    pub fn view(&self, key: &K) -> Option<BoundaryView<N>> {
        self.inner.list.borrow().get_view(key)
    }

    #[must_use]
    pub fn child_lifecycle(&self, key: &K) -> Option<Lifecycle> {
        self.inner.children.borrow().get(key).cloned()
    }
}

struct BatchObserver<K, N: HostNode, C> {
    writer: ViewChangeWriter<K, N>,
    _child: PhantomData<fn(C)>,
}

impl<K, N, C> Observer<Vec<ViewChange<K, C>>> for BatchObserver<K, N, C>
where
    K: Clone + Eq + Hash + fmt::Debug + 'static,
    N: HostNode,
    C: IntoControl<N>,
{
    fn next(&self, batch: Vec<ViewChange<K, C>>) {
        if let Err(err) = self.writer.apply(batch) {
            error!(error = %err, "view change batch rejected; shutting the view down");
            self.writer.shutdown();
        }
    }

    fn complete(&self) {
        self.writer.shutdown();
    }
}

/// A control that drives a [`ViewChangeWriter`] from `source`.
///
/// The source is subscribed on init and released when the control's
/// lifecycle fires.
pub fn view_control<K, N, C, S>(source: S) -> BoxedControl<N>
where
    K: Clone + Eq + Hash + fmt::Debug + 'static,
    N: HostNode,
    C: IntoControl<N> + 'static,
    S: Subscribable<Vec<ViewChange<K, C>>> + 'static,
{
    control_fn(move |cx: ViewContext<N>| {
        let writer = ViewChangeWriter::new(cx);
        writer.attach(&source);
    })
}
