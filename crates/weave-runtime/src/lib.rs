#![forbid(unsafe_code)]

//! Runtime services for Weave.
//!
//! - [`scheduler`]: batches deferred host-tree work into ordered queues and
//!   flushes them once per cycle through a host-supplied [`FlushPort`].
//! - [`reactive`]: minimal push streams used to feed orderings and change
//!   batches into views.

pub mod reactive;
pub mod scheduler;

pub use reactive::{
    FnObserver, Observer, StreamSubscription, Subject, Subscribable, map_stream, until_detach,
};
pub use scheduler::{
    FlushCallback, FlushPort, ManualFlushPort, QueueName, Scheduler, SchedulerConfig,
    SchedulerStats, Task, TaskError, TaskMetadata, TaskPanicked, TaskResult,
};
