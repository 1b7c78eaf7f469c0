//! Out-of-band failure reporting.

use crate::error::DeliveryFailure;

/// Receives delivery failures nobody else can see: deferred deliveries
/// whose caller has already returned, and failures of proxy methods that
/// return `()`.
pub trait FailureObserver: Send + Sync + 'static {
    /// Called once per failed delivery.
    fn on_failure(&self, failure: &DeliveryFailure);
}

impl<F> FailureObserver for F
where
    F: Fn(&DeliveryFailure) + Send + Sync + 'static,
{
    fn on_failure(&self, failure: &DeliveryFailure) {
        (self)(failure)
    }
}
