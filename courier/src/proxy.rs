//! # Dispatch Proxy
//!
//! A [`Proxy<dyn I>`](Proxy) implements interface `I` by fanning every
//! dispatchable call out to the listeners registered for `I` (and for the
//! proxy's tag, if any). The forwarding bodies are generated by
//! `#[courier::listener]`; they all funnel into [`Proxy::dispatch`].
//!
//! Listeners are resolved at call time, so a proxy stays valid across
//! registrations and unregistrations.

use crate::{
    hub::Hub,
    scheduler::{Invocation, Scheduler},
};
use courier_core::{BoxError, DeliveryFailure, DispatchError, Interface};
use std::{marker::PhantomData, panic, sync::Arc};
use tracing::{debug, error, trace};

/// Placeholder for a method index outside the descriptor table.
const UNKNOWN_METHOD: &str = "<unknown>";

/// A dispatch proxy for interface `I`, bound to a hub and an optional tag.
///
/// Obtained from [`Hub::of`]. Cloning is cheap.
///
/// # Example
///
/// ```rust,ignore
/// let clicks = hub.of::<dyn Click>("toolbar");
/// clicks.on_click(3);
/// ```
pub struct Proxy<I: ?Sized> {
    hub: Hub,
    tag: Option<Arc<str>>,
    _interface: PhantomData<fn() -> Box<I>>,
}

impl<I: Interface + ?Sized> Proxy<I> {
    pub(crate) fn new(hub: Hub, tag: Option<Arc<str>>) -> Self {
        Self {
            hub,
            tag,
            _interface: PhantomData,
        }
    }

    /// Tag this proxy dispatches to. `None` reaches every listener of `I`.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// The hub this proxy dispatches through.
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Number of listeners a call would reach right now.
    pub fn listener_count(&self) -> usize {
        self.hub.registry().lookup::<I>(self.tag()).len()
    }

    /// Dispatch a call of method number `method` to every matching listener.
    ///
    /// Every listener is attempted even when an earlier one fails. Sync
    /// failures and executor refusals are aggregated into the returned
    /// error. Failures of accepted deferred deliveries go to the hub's
    /// failure observer.
    ///
    /// A method that is not dispatchable fails with
    /// [`DispatchError::MethodNotDispatchable`] before any listener is
    /// touched.
    pub fn dispatch<F>(&self, method: usize, invoke: F) -> Result<(), DispatchError>
    where
        F: Fn(&I) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let descriptor = match I::method(method) {
            Some(descriptor) if descriptor.dispatchable => descriptor,
            _ => return Err(self.reject(method)),
        };

        let targets = self.hub.registry().lookup::<I>(self.tag());
        trace!(
            interface = I::NAME,
            method = descriptor.name,
            tag = ?self.tag,
            listeners = targets.len(),
            "dispatching"
        );
        if targets.is_empty() {
            return Ok(());
        }

        let invocation: Invocation<I> = Arc::new(invoke);
        let scheduler: &Scheduler = self.hub.scheduler();
        let failures = targets
            .iter()
            .filter_map(|entry| scheduler.deliver(entry, descriptor, &invocation).err())
            .collect();

        match DispatchError::aggregate(failures) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// The error for calling a method that proxies do not forward.
    #[doc(hidden)]
    pub fn reject(&self, method: usize) -> DispatchError {
        let method = I::method(method).map_or(UNKNOWN_METHOD, |descriptor| descriptor.name);
        debug!(interface = I::NAME, method, "rejected non-dispatchable method");
        DispatchError::MethodNotDispatchable {
            interface: I::NAME,
            method,
        }
    }

    /// Settle the failures of a call that has no error channel.
    ///
    /// Executor refusals go to the observer. Failed sync deliveries are
    /// raised on the calling thread once every listener has been attempted,
    /// with a [`DispatchError::DeliveryFailed`] as the panic payload.
    #[doc(hidden)]
    pub fn report(&self, error: DispatchError) {
        let (rejected, failed): (Vec<_>, Vec<_>) = error
            .into_failures()
            .into_iter()
            .partition(DeliveryFailure::is_rejection);

        let observer = self.hub.scheduler().observer();
        for failure in &rejected {
            observer.on_failure(failure);
        }
        if failed.is_empty() {
            return;
        }

        let error = DispatchError::DeliveryFailed(failed);
        for failure in error.failures() {
            error!(
                listener = failure.listener(),
                interface = failure.interface(),
                method = failure.method(),
                cause = %failure.kind(),
                "sync delivery failed"
            );
        }
        panic::panic_any(error);
    }
}

impl<I: ?Sized> Clone for Proxy<I> {
    fn clone(&self) -> Self {
        Self {
            hub: self.hub.clone(),
            tag: self.tag.clone(),
            _interface: PhantomData,
        }
    }
}

impl<I: Interface + ?Sized> std::fmt::Debug for Proxy<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("interface", &I::NAME)
            .field("tag", &self.tag)
            .finish()
    }
}
