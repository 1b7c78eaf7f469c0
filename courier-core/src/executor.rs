//! # Delivery Jobs
//!
//! A [`Job`] is one dispatched call bound to one listener. It moves through
//! [`JobState::Pending`] → [`JobState::Running`] → `Completed` or `Failed`
//! exactly once; nothing retries it.
//!
//! Deferred jobs are handed to an [`Executor`], the background execution
//! context injected by the host.

use crate::{
    descriptor::DeliveryMode,
    error::{BoxError, DeliveryFailure, FailureKind, SchedulerError},
    listener::ListenerId,
    observer::FailureObserver,
};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

/// Addressing information of a single delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Listener name.
    pub listener: &'static str,
    /// Interface name.
    pub interface: &'static str,
    /// Method name.
    pub method: &'static str,
    /// Mode the delivery runs with.
    pub mode: DeliveryMode,
}

/// How a [`Job`] ended.
///
/// A `Job` value that still exists has not run yet; running consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// The listener method returned successfully.
    Completed,
    /// The listener method returned an error or panicked.
    Failed,
}

type Task = Box<dyn FnOnce() -> Result<(), BoxError> + Send + 'static>;

/// One listener invocation, ready to run.
pub struct Job {
    delivery: Delivery,
    task: Task,
    observer: Option<Arc<dyn FailureObserver>>,
}

impl Job {
    /// Wrap a task for the given delivery.
    pub fn new<F>(delivery: Delivery, task: F) -> Self
    where
        F: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        Self {
            delivery,
            task: Box::new(task),
            observer: None,
        }
    }

    /// Report a failure of this job to `observer` when it is [`run`](Job::run).
    pub fn observed_by(mut self, observer: Arc<dyn FailureObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Addressing information of this job.
    pub fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    /// Run the task on the current thread and return its outcome.
    ///
    /// Panics raised by the listener are caught and reported as
    /// [`FailureKind::Panic`].
    pub fn execute(self) -> Result<(), DeliveryFailure> {
        let Job {
            delivery, task, ..
        } = self;
        match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(DeliveryFailure::new(delivery, FailureKind::Error(error))),
            Err(payload) => Err(DeliveryFailure::new(
                delivery,
                FailureKind::Panic(panic_message(payload.as_ref())),
            )),
        }
    }

    /// Run the task on the current thread. A failure is handed to the
    /// observer, if any, since nobody is waiting for the outcome.
    ///
    /// This is the entry point executors use.
    pub fn run(mut self) -> JobState {
        let observer = self.observer.take();
        match self.execute() {
            Ok(()) => JobState::Completed,
            Err(failure) => {
                if let Some(observer) = observer {
                    observer.on_failure(&failure);
                }
                JobState::Failed
            }
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("delivery", &self.delivery)
            .field("observed", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// A background execution context for deferred deliveries.
///
/// Implementations must run every accepted job exactly once and must
/// preserve submission order for jobs sharing the same `key`. They should
/// never block the submitting thread: when no capacity is left, return
/// [`SchedulerError::Saturated`].
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot run deferred deliveries",
    label = "missing `Executor` implementation",
    note = "Implement `Executor::execute` to accept jobs keyed by listener."
)]
pub trait Executor: Send + Sync + 'static {
    /// Accept a job for background execution.
    fn execute(&self, key: ListenerId, job: Job) -> Result<(), SchedulerError>;
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, key: ListenerId, job: Job) -> Result<(), SchedulerError> {
        (**self).execute(key, job)
    }
}
