//! Testing utilities for Courier.
//!
//! This module provides utilities to make testing listeners and delivery
//! behaviour easier.
//!
//! # Features
//!
//! - [`CallLog`]: A shared log listeners write to, with a blocking wait
//!   for deferred deliveries
//! - [`RecordingObserver`]: A failure observer that records what it receives
//! - [`ManualExecutor`]: An executor that queues jobs until told to run them
//! - [`RejectingExecutor`]: An executor that refuses every job

use courier_core::{
    Delivery, DeliveryFailure, Executor, FailureKind, FailureObserver, Job, ListenerId,
    SchedulerError,
};
use parking_lot::{Condvar, Mutex};
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

// ============================================================================
// Call Log
// ============================================================================

/// One recorded listener call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// What the listener recorded.
    pub label: String,
    /// Name of the thread the call ran on.
    pub thread: Option<String>,
}

/// A shared, ordered log of listener calls.
///
/// # Example
///
/// ```rust,ignore
/// let log = CallLog::new();
/// let spy = Arc::new(Spy::new(log.clone()));
/// hub.register(&spy)?;
///
/// hub.of::<dyn Click>(None).on_click(1);
/// assert!(log.wait_for(1, Duration::from_secs(1)));
/// assert_eq!(log.labels(), vec!["click 1"]);
/// ```
#[derive(Clone, Default)]
pub struct CallLog {
    inner: Arc<(Mutex<Vec<Call>>, Condvar)>,
}

impl CallLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call made on the current thread.
    pub fn record(&self, label: impl Into<String>) {
        let call = Call {
            label: label.into(),
            thread: thread::current().name().map(str::to_owned),
        };
        let (calls, changed) = &*self.inner;
        calls.lock().push(call);
        changed.notify_all();
    }

    /// Get a clone of the recorded calls.
    pub fn calls(&self) -> Vec<Call> {
        self.inner.0.lock().clone()
    }

    /// Recorded labels, in order.
    pub fn labels(&self) -> Vec<String> {
        self.inner.0.lock().iter().map(|call| call.label.clone()).collect()
    }

    /// Get the number of recorded calls.
    pub fn len(&self) -> usize {
        self.inner.0.lock().len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all recorded calls.
    pub fn clear(&self) {
        self.inner.0.lock().clear();
    }

    /// Block until at least `count` calls are recorded or `timeout` passes.
    ///
    /// Returns whether the count was reached.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (calls, changed) = &*self.inner;
        let mut calls = calls.lock();
        while calls.len() < count {
            if changed.wait_until(&mut calls, deadline).timed_out() {
                return calls.len() >= count;
            }
        }
        true
    }
}

impl std::fmt::Debug for CallLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.inner.0.lock().iter()).finish()
    }
}

// ============================================================================
// Recording Observer
// ============================================================================

/// A failure as seen by a [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFailure {
    /// The failed delivery.
    pub delivery: Delivery,
    /// Rendered cause.
    pub cause: String,
    /// Whether the listener panicked.
    pub panicked: bool,
    /// Whether the executor rejected the delivery.
    pub rejected: bool,
}

/// A failure observer that records every failure it receives.
///
/// Clones share the same record.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    failures: Arc<(Mutex<Vec<RecordedFailure>>, Condvar)>,
}

impl RecordingObserver {
    /// Create an empty observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clone of the recorded failures.
    pub fn failures(&self) -> Vec<RecordedFailure> {
        self.failures.0.lock().clone()
    }

    /// Get the number of recorded failures.
    pub fn count(&self) -> usize {
        self.failures.0.lock().len()
    }

    /// Clear all recorded failures.
    pub fn clear(&self) {
        self.failures.0.lock().clear();
    }

    /// Block until at least `count` failures are recorded or `timeout`
    /// passes. Returns whether the count was reached.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (failures, changed) = &*self.failures;
        let mut failures = failures.lock();
        while failures.len() < count {
            if changed.wait_until(&mut failures, deadline).timed_out() {
                return failures.len() >= count;
            }
        }
        true
    }
}

impl FailureObserver for RecordingObserver {
    fn on_failure(&self, failure: &DeliveryFailure) {
        let record = RecordedFailure {
            delivery: *failure.delivery(),
            cause: failure.kind().to_string(),
            panicked: matches!(failure.kind(), FailureKind::Panic(_)),
            rejected: failure.is_rejection(),
        };
        let (failures, changed) = &*self.failures;
        failures.lock().push(record);
        changed.notify_all();
    }
}

impl std::fmt::Debug for RecordingObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingObserver")
            .field("failures", &*self.failures.0.lock())
            .finish()
    }
}

// ============================================================================
// Manual Executor
// ============================================================================

/// An executor that holds jobs until [`run_all`](ManualExecutor::run_all).
///
/// Lets a test observe the state between dispatch and deferred execution.
/// Clones share the same queue.
#[derive(Clone, Default)]
pub struct ManualExecutor {
    queue: Arc<Mutex<Vec<(ListenerId, Job)>>>,
}

impl ManualExecutor {
    /// Create an empty executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs waiting.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Deliveries waiting, in submission order.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.queue.lock().iter().map(|(_, job)| *job.delivery()).collect()
    }

    /// Run every queued job on the current thread, in submission order.
    ///
    /// Jobs queued while running are run too. Returns the number of jobs run.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        loop {
            let batch = std::mem::take(&mut *self.queue.lock());
            if batch.is_empty() {
                return ran;
            }
            for (_, job) in batch {
                job.run();
                ran += 1;
            }
        }
    }

    /// Drop every queued job without running it.
    pub fn discard(&self) -> usize {
        std::mem::take(&mut *self.queue.lock()).len()
    }
}

impl Executor for ManualExecutor {
    fn execute(&self, key: ListenerId, job: Job) -> Result<(), SchedulerError> {
        self.queue.lock().push((key, job));
        Ok(())
    }
}

impl std::fmt::Debug for ManualExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualExecutor")
            .field("pending", &self.pending())
            .finish()
    }
}

// ============================================================================
// Rejecting Executor
// ============================================================================

/// An executor that refuses every job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectingExecutor {
    /// Reject with [`SchedulerError::Saturated`].
    Saturated {
        /// Capacity reported in the error.
        capacity: usize,
    },
    /// Reject with [`SchedulerError::ShutDown`].
    ShutDown,
}

impl Executor for RejectingExecutor {
    fn execute(&self, _key: ListenerId, _job: Job) -> Result<(), SchedulerError> {
        Err(match *self {
            RejectingExecutor::Saturated { capacity } => SchedulerError::Saturated { capacity },
            RejectingExecutor::ShutDown => SchedulerError::ShutDown,
        })
    }
}
