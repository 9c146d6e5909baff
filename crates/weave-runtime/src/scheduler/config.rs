#![forbid(unsafe_code)]

//! Scheduler configuration.

/// Tunables for [`Scheduler`](super::Scheduler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Catch panics raised by task operations and log them as task faults.
    /// When disabled a panicking task unwinds out of the flush.
    /// Default: true
    pub catch_panics: bool,

    /// A flush running more tasks than this logs a warning.
    /// Default: 4096
    pub slow_flush_task_threshold: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            catch_panics: true,
            slow_flush_task_threshold: 4096,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }

    #[must_use]
    pub fn with_slow_flush_task_threshold(mut self, threshold: usize) -> Self {
        self.slow_flush_task_threshold = threshold;
        self
    }

    /// Normalize out-of-range values.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let mut config = self.clone();
        config.slow_flush_task_threshold = config.slow_flush_task_threshold.max(1);
        config
    }
}
