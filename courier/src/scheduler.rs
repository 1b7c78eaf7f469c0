//! # Delivery Scheduler
//!
//! Decides, per listener, how a dispatched call runs:
//!
//! - **Sync**: on the calling thread, before the proxy method returns.
//!   Failures are returned to the caller.
//! - **Deferred**: as a [`Job`] handed to the injected [`Executor`]. The
//!   proxy method returns once the job is accepted; failures of the job go
//!   to the [`FailureObserver`].
//!
//! The effective mode of a delivery is the method's override, else the
//! mode fixed at registration.

use courier_core::{
    BoxError, Delivery, DeliveryFailure, DeliveryMode, Executor, FailureObserver, Interface, Job,
    MethodDescriptor,
};
use courier_std::ListenerEntry;
use std::sync::Arc;
use tracing::trace;

/// A captured proxy call, replayable against any listener of `I`.
pub type Invocation<I> = Arc<dyn Fn(&I) -> Result<(), BoxError> + Send + Sync>;

/// Delivery policy of a hub: the background executor and the observer of
/// failures nobody waits for.
#[derive(Clone)]
pub struct Scheduler {
    executor: Arc<dyn Executor>,
    observer: Arc<dyn FailureObserver>,
}

impl Scheduler {
    /// Create a scheduler.
    pub fn new(executor: Arc<dyn Executor>, observer: Arc<dyn FailureObserver>) -> Self {
        Self { executor, observer }
    }

    /// The background executor.
    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    /// The failure observer.
    pub fn observer(&self) -> &Arc<dyn FailureObserver> {
        &self.observer
    }

    /// Mode a call of `method` runs with for `entry`.
    pub fn effective_mode(entry: &ListenerEntry, method: &MethodDescriptor) -> DeliveryMode {
        method.delivery.unwrap_or_else(|| entry.delivery_mode())
    }

    /// Deliver one call to one listener.
    ///
    /// A listener that has been dropped in the meantime is skipped. For a
    /// deferred delivery the only possible error is the executor's refusal.
    pub fn deliver<I: Interface + ?Sized>(
        &self,
        entry: &ListenerEntry,
        method: &'static MethodDescriptor,
        invocation: &Invocation<I>,
    ) -> Result<(), DeliveryFailure> {
        let Some(handle) = entry.handle::<I>() else {
            return Ok(());
        };
        let delivery = Delivery {
            listener: entry.name(),
            interface: I::NAME,
            method: method.name,
            mode: Self::effective_mode(entry, method),
        };
        let invocation = Arc::clone(invocation);

        match delivery.mode {
            DeliveryMode::Sync => {
                let Some(listener) = handle.upgrade() else {
                    return Ok(());
                };
                trace!(
                    listener = delivery.listener,
                    interface = delivery.interface,
                    method = delivery.method,
                    "delivering inline"
                );
                Job::new(delivery, move || invocation(&*listener)).execute()
            }
            DeliveryMode::Deferred => {
                // The job holds the listener weakly until it runs.
                let job = Job::new(delivery, move || match handle.upgrade() {
                    Some(listener) => invocation(&*listener),
                    None => Ok(()),
                })
                .observed_by(Arc::clone(&self.observer));
                trace!(
                    listener = delivery.listener,
                    interface = delivery.interface,
                    method = delivery.method,
                    "scheduling deferred delivery"
                );
                self.executor
                    .execute(entry.id(), job)
                    .map_err(|error| DeliveryFailure::rejected(delivery, error))
            }
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{Capabilities, FailureKind, Listener, SchedulerError};
    use courier_std::{
        RegistrationMeta, Registry,
        testing::{CallLog, ManualExecutor, RecordingObserver, RejectingExecutor},
    };
    use std::sync::Weak;

    trait Ping: Send + Sync {
        fn ping(&self, n: u32);
    }

    impl Interface for dyn Ping {
        const NAME: &'static str = "Ping";
        const METHODS: &'static [MethodDescriptor] = &[
            MethodDescriptor::dispatchable("ping"),
            MethodDescriptor::dispatchable("ping_later").with_delivery(DeliveryMode::Deferred),
        ];
    }

    struct Paddle {
        log: CallLog,
    }

    impl Ping for Paddle {
        fn ping(&self, n: u32) {
            self.log.record(format!("ping {n}"));
        }
    }

    impl Listener for Paddle {
        fn capabilities(caps: &mut Capabilities<Self>) {
            caps.implements::<dyn Ping>(|listener| {
                let handle: Weak<dyn Ping> = listener;
                handle
            });
        }

        fn name(&self) -> &'static str {
            "paddle"
        }
    }

    fn ping(n: u32) -> Invocation<dyn Ping> {
        Arc::new(
            move |listener: &(dyn Ping + 'static)| -> Result<(), BoxError> {
                listener.ping(n);
                Ok(())
            },
        )
    }

    fn setup(meta: RegistrationMeta) -> (Registry, Arc<Paddle>, CallLog) {
        let log = CallLog::new();
        let paddle = Arc::new(Paddle { log: log.clone() });
        let registry = Registry::new();
        registry.register(&paddle, meta).unwrap();
        (registry, paddle, log)
    }

    #[test]
    fn test_effective_mode_prefers_method_override() {
        let (registry, _paddle, _log) = setup(RegistrationMeta::new());
        let entry = &registry.lookup::<dyn Ping>(None)[0];

        let methods = <dyn Ping as Interface>::METHODS;
        assert_eq!(Scheduler::effective_mode(entry, &methods[0]), DeliveryMode::Sync);
        assert_eq!(
            Scheduler::effective_mode(entry, &methods[1]),
            DeliveryMode::Deferred
        );
    }

    #[test]
    fn test_sync_delivery_runs_inline() {
        let (registry, _paddle, log) = setup(RegistrationMeta::new());
        let executor = ManualExecutor::new();
        let scheduler = Scheduler::new(
            Arc::new(executor.clone()),
            Arc::new(RecordingObserver::new()),
        );

        let entry = &registry.lookup::<dyn Ping>(None)[0];
        let method = <dyn Ping as Interface>::method(0).unwrap();
        scheduler.deliver(entry, method, &ping(1)).unwrap();

        assert_eq!(log.labels(), vec!["ping 1"]);
        assert_eq!(executor.pending(), 0);
    }

    #[test]
    fn test_deferred_delivery_is_queued() {
        let (registry, _paddle, log) =
            setup(RegistrationMeta::new().with_delivery(DeliveryMode::Deferred));
        let executor = ManualExecutor::new();
        let scheduler = Scheduler::new(
            Arc::new(executor.clone()),
            Arc::new(RecordingObserver::new()),
        );

        let entry = &registry.lookup::<dyn Ping>(None)[0];
        let method = <dyn Ping as Interface>::method(0).unwrap();
        scheduler.deliver(entry, method, &ping(2)).unwrap();

        assert!(log.is_empty());
        assert_eq!(executor.run_all(), 1);
        assert_eq!(log.labels(), vec!["ping 2"]);
    }

    #[test]
    fn test_rejected_deferred_delivery() {
        let (registry, _paddle, _log) = setup(RegistrationMeta::new());
        let scheduler = Scheduler::new(
            Arc::new(RejectingExecutor::Saturated { capacity: 4 }),
            Arc::new(RecordingObserver::new()),
        );

        let entry = &registry.lookup::<dyn Ping>(None)[0];
        let method = <dyn Ping as Interface>::method(1).unwrap();
        let failure = scheduler.deliver(entry, method, &ping(3)).unwrap_err();

        assert_eq!(failure.listener(), "paddle");
        assert_eq!(failure.method(), "ping_later");
        assert!(matches!(
            failure.kind(),
            FailureKind::Rejected(SchedulerError::Saturated { capacity: 4 })
        ));
    }
}
