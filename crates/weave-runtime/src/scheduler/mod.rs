#![forbid(unsafe_code)]

//! Deferred task scheduler.
//!
//! Tasks are grouped by [`QueueName`] and executed together in one flush.
//! `schedule` only enqueues: the first call after a flush asks the
//! [`FlushPort`] for a callback, later calls coalesce into the same flush.
//!
//! # Flush order
//!
//! 1. All `mutate` tasks, in enqueue order.
//! 2. All `measure` tasks, in enqueue order.
//! 3. Each custom queue in the order its name was first seen, each in
//!    enqueue order.
//!
//! # Invariants
//!
//! 1. At most one flush request is outstanding at the port, and only the
//!    port callback retires it.
//! 2. The live queue set is swapped out before the first task runs, so a task
//!    scheduled during flush N runs in flush N+1.
//! 3. [`Scheduler::running_queue`] names the queue being executed, and is
//!    `None` outside a flush.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Operation returns `Err` | Logged at `error!`, remaining tasks still run |
//! | Operation panics, `catch_panics` set | Logged at `error!`, remaining tasks still run |
//! | Operation panics, `catch_panics` unset | Panic unwinds out of the flush; the scheduler stays usable |
//! | `flush` called from inside a task | Ignored with a `warn!` |
//! | `flush` called directly while a request is outstanding | Runs the queued work; the request stays outstanding and later schedules join it |
//! | Port callback arrives while a flush is running | Re-requested so queued work runs after the current flush |
//! | Flush larger than the configured threshold | Logged at `warn!` |

mod config;
mod port;
mod task;

pub use config::SchedulerConfig;
pub use port::{FlushCallback, FlushPort, ManualFlushPort};
pub use task::{QueueName, Task, TaskError, TaskMetadata, TaskPanicked, TaskResult};

use std::any::Any;
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use tracing::{error, trace, warn};

/// Counters accumulated over the scheduler's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Completed flushes.
    pub flushes: u64,
    /// Tasks that ran to completion.
    pub tasks_run: u64,
    /// Tasks that returned an error or panicked.
    pub tasks_failed: u64,
}

// ---------------------------------------------------------------------------
// Queue set
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TaskQueues {
    mutate: Vec<Task>,
    measure: Vec<Task>,
    custom: Vec<(Cow<'static, str>, Vec<Task>)>,
}

impl TaskQueues {
    fn push(&mut self, task: Task) {
        match task.queue() {
            QueueName::Mutate => self.mutate.push(task),
            QueueName::Measure => self.measure.push(task),
            QueueName::Custom(name) => match self.custom.iter().position(|(n, _)| n == name) {
                Some(index) => self.custom[index].1.push(task),
                None => {
                    let name = name.clone();
                    self.custom.push((name, vec![task]));
                }
            },
        }
    }

    fn len(&self) -> usize {
        self.mutate.len()
            + self.measure.len()
            + self.custom.iter().map(|(_, tasks)| tasks.len()).sum::<usize>()
    }

    fn into_ordered(self) -> impl Iterator<Item = (QueueName, Vec<Task>)> {
        [
            (QueueName::Mutate, self.mutate),
            (QueueName::Measure, self.measure),
        ]
        .into_iter()
        .chain(
            self.custom
                .into_iter()
                .map(|(name, tasks)| (QueueName::Custom(name), tasks)),
        )
        .filter(|(_, tasks)| !tasks.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

struct SchedulerInner {
    port: Box<dyn FlushPort>,
    config: SchedulerConfig,
    queues: RefCell<TaskQueues>,
    flush_requested: Cell<bool>,
    flushing: Cell<bool>,
    running: RefCell<Option<QueueName>>,
    stats: Cell<SchedulerStats>,
}

/// Shared handle to a task scheduler.
///
/// Clones refer to the same queues.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending_tasks", &self.pending_tasks())
            .field("running_queue", &self.running_queue())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Resets the flushing state even if a task unwinds.
struct FlushGuard<'a> {
    inner: &'a SchedulerInner,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        *self.inner.running.borrow_mut() = None;
        self.inner.flushing.set(false);
    }
}

impl Scheduler {
    /// Create a scheduler with the default configuration.
    pub fn new(port: impl FlushPort + 'static) -> Self {
        Self::with_config(port, SchedulerConfig::default())
    }

    pub fn with_config(port: impl FlushPort + 'static, config: SchedulerConfig) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                port: Box::new(port),
                config: config.sanitized(),
                queues: RefCell::new(TaskQueues::default()),
                flush_requested: Cell::new(false),
                flushing: Cell::new(false),
                running: RefCell::new(None),
                stats: Cell::new(SchedulerStats::default()),
            }),
        }
    }

    /// Enqueue a task for the next flush.
    pub fn schedule(&self, task: Task) {
        self.inner.queues.borrow_mut().push(task);
        self.request_flush();
    }

    /// Run `task` now if its queue is the one currently executing, otherwise
    /// schedule it.
    pub fn run_or_schedule(&self, task: Task) {
        let running = self.inner.running.borrow().as_ref() == Some(task.queue());
        if running {
            let (queue, metadata, operation) = task.into_parts();
            self.run_task(&queue, metadata.as_ref(), operation);
        } else {
            self.schedule(task);
        }
    }

    /// Schedule `callback` on the `mutate` queue of the next flush.
    pub fn on_next_flush(&self, callback: impl FnOnce() + 'static) {
        self.schedule(
            Task::mutate(move || {
                callback();
                Ok(())
            })
            .with_metadata(TaskMetadata::new("on_next_flush")),
        );
    }

    /// The queue currently executing, if a flush is in progress.
    #[must_use]
    pub fn running_queue(&self) -> Option<QueueName> {
        self.inner.running.borrow().clone()
    }

    /// Tasks waiting for the next flush.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.inner.queues.borrow().len()
    }

    /// Whether a flush has been requested from the port and not yet run.
    #[must_use]
    pub fn is_flush_requested(&self) -> bool {
        self.inner.flush_requested.get()
    }

    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.inner.stats.get()
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Whether two handles refer to the same scheduler.
    #[must_use]
    pub fn ptr_eq(&self, other: &Scheduler) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn request_flush(&self) {
        if self.inner.flush_requested.replace(true) {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        self.inner.port.request_flush(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                Scheduler { inner }.flush_from_port();
            }
        }));
    }

    fn flush_from_port(&self) {
        self.inner.flush_requested.set(false);
        if self.inner.flushing.get() {
            trace!("port callback arrived during a flush; requesting again");
            self.request_flush();
            return;
        }
        self.flush();
    }

    /// Execute every queued task. Returns the number of tasks executed.
    ///
    /// Normally invoked through the port callback. A direct call leaves an
    /// outstanding port request in place; it runs whatever is queued by then.
    pub fn flush(&self) -> usize {
        if self.inner.flushing.get() {
            warn!("scheduler flush requested from inside a running task; ignored");
            return 0;
        }
        let queues = mem::take(&mut *self.inner.queues.borrow_mut());
        let total = queues.len();
        if total == 0 {
            return 0;
        }

        let _span = tracing::trace_span!("scheduler.flush", tasks = total).entered();
        self.inner.flushing.set(true);
        let guard = FlushGuard { inner: &self.inner };
        for (queue, tasks) in queues.into_ordered() {
            trace!(queue = %queue, tasks = tasks.len(), "running queue");
            *self.inner.running.borrow_mut() = Some(queue.clone());
            for task in tasks {
                let (_, metadata, operation) = task.into_parts();
                self.run_task(&queue, metadata.as_ref(), operation);
            }
        }
        drop(guard);

        let mut stats = self.inner.stats.get();
        stats.flushes += 1;
        self.inner.stats.set(stats);

        if total > self.inner.config.slow_flush_task_threshold {
            warn!(
                tasks = total,
                threshold = self.inner.config.slow_flush_task_threshold,
                "slow flush"
            );
        }
        total
    }

    fn run_task(
        &self,
        queue: &QueueName,
        metadata: Option<&TaskMetadata>,
        operation: Box<dyn FnOnce() -> TaskResult>,
    ) {
        let outcome = if self.inner.config.catch_panics {
            match catch_unwind(AssertUnwindSafe(operation)) {
                Ok(result) => result,
                Err(payload) => Err(Box::new(TaskPanicked {
                    message: panic_message(payload.as_ref()),
                }) as TaskError),
            }
        } else {
            operation()
        };

        let mut stats = self.inner.stats.get();
        match outcome {
            Ok(()) => stats.tasks_run += 1,
            Err(err) => {
                stats.tasks_failed += 1;
                error!(
                    queue = %queue,
                    signature = metadata.map_or("anonymous", |m| m.signature),
                    target = metadata.and_then(|m| m.target.as_deref()).unwrap_or(""),
                    error = %err,
                    "scheduled task failed"
                );
            }
        }
        self.inner.stats.set(stats);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}
