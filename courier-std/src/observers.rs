//! Failure observers.

use courier_core::{DeliveryFailure, FailureObserver};

/// Logs every reported failure at `error` level.
///
/// This is the observer a hub uses unless another one is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl FailureObserver for LoggingObserver {
    fn on_failure(&self, failure: &DeliveryFailure) {
        tracing::error!(
            listener = failure.listener(),
            interface = failure.interface(),
            method = failure.method(),
            mode = %failure.mode(),
            cause = %failure.kind(),
            "{failure}"
        );
    }
}
