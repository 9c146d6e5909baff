#![forbid(unsafe_code)]

//! Units of deferred work.

use std::borrow::Cow;
use std::fmt;

/// Error returned by a task operation.
pub type TaskError = Box<dyn std::error::Error>;

/// Result of running a task operation.
pub type TaskResult = Result<(), TaskError>;

// ---------------------------------------------------------------------------
// QueueName
// ---------------------------------------------------------------------------

/// Name of the queue a task is scheduled on.
///
/// `Mutate` and `Measure` are pre-registered and always run first, in that
/// order. Custom queues run afterwards in the order they were first seen.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueueName {
    /// Host-tree writes.
    Mutate,
    /// Host-tree reads (layout measurement).
    Measure,
    /// Any other queue.
    Custom(Cow<'static, str>),
}

impl QueueName {
    /// Build a queue name, mapping `"mutate"` and `"measure"` to the
    /// pre-registered variants.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        match name.as_ref() {
            "mutate" => Self::Mutate,
            "measure" => Self::Measure,
            _ => Self::Custom(name),
        }
    }

    /// The queue's string name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Mutate => "mutate",
            Self::Measure => "measure",
            Self::Custom(name) => name,
        }
    }

    /// Whether this is one of the two pre-registered queues.
    #[must_use]
    pub const fn is_builtin(&self) -> bool {
        matches!(self, Self::Mutate | Self::Measure)
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&'static str> for QueueName {
    fn from(name: &'static str) -> Self {
        Self::named(name)
    }
}

impl From<String> for QueueName {
    fn from(name: String) -> Self {
        Self::named(name)
    }
}

// ---------------------------------------------------------------------------
// TaskMetadata
// ---------------------------------------------------------------------------

/// Diagnostic description attached to a task.
///
/// Only used for logging; the scheduler never inspects it otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskMetadata {
    /// Static operation name, e.g. `"remove_view_child"`.
    pub signature: &'static str,
    /// What the task operates on.
    pub target: Option<String>,
    /// Free-form key/value details.
    pub fields: Vec<(&'static str, String)>,
}

impl TaskMetadata {
    #[must_use]
    pub fn new(signature: &'static str) -> Self {
        Self {
            signature,
            target: None,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.fields.push((key, value.into()));
        self
    }

    /// Look up a field by key.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

type Operation = Box<dyn FnOnce() -> TaskResult>;

/// A deferred operation tagged with a queue name.
///
/// Tasks are immutable once built and consumed when they run.
pub struct Task {
    operation: Operation,
    queue: QueueName,
    metadata: Option<TaskMetadata>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("queue", &self.queue)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl Task {
    /// Create a task on an arbitrary queue.
    pub fn new(
        queue: impl Into<QueueName>,
        operation: impl FnOnce() -> TaskResult + 'static,
    ) -> Self {
        Self {
            operation: Box::new(operation),
            queue: queue.into(),
            metadata: None,
        }
    }

    /// Create a task on the `mutate` queue.
    pub fn mutate(operation: impl FnOnce() -> TaskResult + 'static) -> Self {
        Self::new(QueueName::Mutate, operation)
    }

    /// Create a task on the `measure` queue.
    pub fn measure(operation: impl FnOnce() -> TaskResult + 'static) -> Self {
        Self::new(QueueName::Measure, operation)
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: TaskMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn queue(&self) -> &QueueName {
        &self.queue
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&TaskMetadata> {
        self.metadata.as_ref()
    }

    pub(crate) fn into_parts(self) -> (QueueName, Option<TaskMetadata>, Operation) {
        (self.queue, self.metadata, self.operation)
    }
}

/// Error recorded when a task operation panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPanicked {
    pub message: String,
}

impl fmt::Display for TaskPanicked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task panicked: {}", self.message)
    }
}

impl std::error::Error for TaskPanicked {}
