//! Error types for Courier.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`CourierError`] - Top-level error type for all Courier operations
//! - [`DispatchError`] - Errors surfaced by a proxy call
//! - [`DeliveryFailure`] - A single listener's failed delivery
//! - [`SchedulerError`] - Errors from background executors
//! - [`RegistryError`] - Errors from listener registration

use crate::{descriptor::DeliveryMode, executor::Delivery};
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all Courier operations.
#[derive(Error, Debug)]
pub enum CourierError {
    /// A proxy call failed.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// The background executor could not be created or used.
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// A listener could not be registered.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A custom error occurred.
    #[error(transparent)]
    Custom(BoxError),
}

/// Errors surfaced to the caller of a proxy method.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The method is not forwarded by proxies. No listener was touched.
    #[error("method `{interface}::{method}` is not dispatchable")]
    MethodNotDispatchable {
        /// Interface name.
        interface: &'static str,
        /// Method name.
        method: &'static str,
    },

    /// At least one synchronous delivery failed. Every matched listener was
    /// still attempted; rejected deferred deliveries of the same call are
    /// listed here too.
    #[error("{} of the listener deliveries failed", .0.len())]
    DeliveryFailed(Vec<DeliveryFailure>),

    /// Every failure of the call was a deferred delivery rejected by a
    /// saturated executor.
    #[error("scheduler rejected {} deferred deliveries", .0.len())]
    SchedulerSaturated(Vec<DeliveryFailure>),
}

impl DispatchError {
    /// The individual delivery failures carried by this error.
    pub fn failures(&self) -> &[DeliveryFailure] {
        match self {
            DispatchError::MethodNotDispatchable { .. } => &[],
            DispatchError::DeliveryFailed(failures)
            | DispatchError::SchedulerSaturated(failures) => failures,
        }
    }

    /// Consumes the error, returning its delivery failures.
    pub fn into_failures(self) -> Vec<DeliveryFailure> {
        match self {
            DispatchError::MethodNotDispatchable { .. } => Vec::new(),
            DispatchError::DeliveryFailed(failures)
            | DispatchError::SchedulerSaturated(failures) => failures,
        }
    }

    /// Returns `true` for [`DispatchError::MethodNotDispatchable`].
    pub fn is_not_dispatchable(&self) -> bool {
        matches!(self, DispatchError::MethodNotDispatchable { .. })
    }

    /// Aggregate the failures of one proxy call.
    ///
    /// Returns `None` when nothing failed.
    pub fn aggregate(failures: Vec<DeliveryFailure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else if failures.iter().all(DeliveryFailure::is_rejection) {
            Some(DispatchError::SchedulerSaturated(failures))
        } else {
            Some(DispatchError::DeliveryFailed(failures))
        }
    }
}

/// One listener's failed delivery.
#[derive(Error, Debug)]
#[error(
    "{} delivery of `{}::{}` to `{}` failed",
    .delivery.mode, .delivery.interface, .delivery.method, .delivery.listener
)]
pub struct DeliveryFailure {
    delivery: Delivery,
    #[source]
    kind: FailureKind,
}

impl DeliveryFailure {
    /// Create a failure for the given delivery.
    pub fn new(delivery: Delivery, kind: FailureKind) -> Self {
        Self { delivery, kind }
    }

    /// A deferred delivery the executor refused to accept.
    pub fn rejected(delivery: Delivery, error: SchedulerError) -> Self {
        Self::new(delivery, FailureKind::Rejected(error))
    }

    /// The delivery that failed.
    pub fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    /// Name of the listener the call was addressed to.
    pub fn listener(&self) -> &'static str {
        self.delivery.listener
    }

    /// Interface name.
    pub fn interface(&self) -> &'static str {
        self.delivery.interface
    }

    /// Method name.
    pub fn method(&self) -> &'static str {
        self.delivery.method
    }

    /// Delivery mode the call was attempted with.
    pub fn mode(&self) -> DeliveryMode {
        self.delivery.mode
    }

    /// What went wrong.
    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    /// Returns `true` if the executor rejected the delivery.
    pub fn is_rejection(&self) -> bool {
        matches!(self.kind, FailureKind::Rejected(_))
    }
}

/// Cause of a [`DeliveryFailure`].
#[derive(Error, Debug)]
pub enum FailureKind {
    /// The listener returned an error.
    #[error("listener returned an error: {0}")]
    Error(#[source] BoxError),

    /// The listener panicked.
    #[error("listener panicked: {0}")]
    Panic(String),

    /// The executor did not accept the delivery.
    #[error(transparent)]
    Rejected(#[from] SchedulerError),
}

/// Errors raised by background executors.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The target queue is full; the delivery was not enqueued.
    #[error("delivery queue is full (capacity {capacity})")]
    Saturated {
        /// Capacity of the rejecting queue.
        capacity: usize,
    },

    /// The executor no longer accepts work.
    #[error("executor has been shut down")]
    ShutDown,

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread")]
    Spawn(#[source] std::io::Error),
}

/// Errors that can occur during registration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The listener declared no interfaces, so nothing could ever reach it.
    #[error("listener `{0}` does not declare any listener interface")]
    NoInterfaces(&'static str),
}

// Convenience conversions
impl From<BoxError> for CourierError {
    fn from(err: BoxError) -> Self {
        CourierError::Custom(err)
    }
}
