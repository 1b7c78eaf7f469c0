//! Inline execution.

use courier_core::{Executor, Job, ListenerId, SchedulerError};

/// Runs deferred jobs immediately on the dispatching thread.
///
/// Useful for hosts without a background context, and in tests that want
/// deterministic ordering. A failing job is still reported to the
/// observer rather than to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, _key: ListenerId, job: Job) -> Result<(), SchedulerError> {
        job.run();
        Ok(())
    }
}
