//! # Hub
//!
//! The [`Hub`] is the dispatcher context a host creates and passes around.
//! It owns the listener [`Registry`], the delivery [`Scheduler`], and, unless
//! another executor was injected, the [`WorkerPool`] running deferred
//! deliveries.
//!
//! # Layer
//!
//! - `courier-core`: vocabulary (interfaces, listeners, jobs, errors)
//! - `courier-std`: registry and executors
//! - `courier` (this crate): the hub, its proxies and the scheduler

use crate::{proxy::Proxy, scheduler::Scheduler};
use courier_core::{
    CourierError, Executor, FailureObserver, Interface, Listener, ListenerId, RegistryError,
};
use courier_std::{LoggingObserver, PoolConfig, RegistrationMeta, Registry, WorkerPool};
use std::sync::Arc;
use tracing::debug;

struct HubInner {
    registry: Registry,
    scheduler: Scheduler,
    pool: Option<Arc<WorkerPool>>,
}

/// A listener registry with sync and deferred delivery.
///
/// Cloning is cheap; clones share the same registry and executor. Hubs are
/// independent of each other.
///
/// # Example
///
/// ```rust,ignore
/// let hub = Hub::new()?;
/// let toolbar = Arc::new(Toolbar::default());
/// hub.register_tagged(&toolbar, "main")?;
///
/// hub.of::<dyn Click>("main").on_click(3);
/// hub.of_any::<dyn Click>().on_click(4);
/// ```
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl Hub {
    /// Create a hub with a default [`WorkerPool`] and a [`LoggingObserver`].
    pub fn new() -> Result<Self, CourierError> {
        Self::builder().build()
    }

    /// Configure a hub.
    pub fn builder() -> HubBuilder {
        HubBuilder::default()
    }

    /// Register a listener without a tag.
    pub fn register<L: Listener>(&self, listener: &Arc<L>) -> Result<ListenerId, RegistryError> {
        self.register_with(listener, RegistrationMeta::new())
    }

    /// Register a listener under `tag`.
    pub fn register_tagged<L: Listener>(
        &self,
        listener: &Arc<L>,
        tag: &str,
    ) -> Result<ListenerId, RegistryError> {
        self.register_with(listener, RegistrationMeta::tagged(tag))
    }

    /// Register a listener with explicit options.
    ///
    /// Registering a listener again with the same tag replaces the earlier
    /// registration in place.
    pub fn register_with<L: Listener>(
        &self,
        listener: &Arc<L>,
        meta: RegistrationMeta,
    ) -> Result<ListenerId, RegistryError> {
        self.inner.registry.register(listener, meta)
    }

    /// Register several listeners, each with an optional tag, in order.
    ///
    /// Stops at the first listener that cannot be registered; the ones
    /// before it stay registered.
    pub fn register_all<'a, L, T>(&self, listeners: T) -> Result<Vec<ListenerId>, RegistryError>
    where
        L: Listener,
        T: IntoIterator<Item = (&'a Arc<L>, Option<&'a str>)>,
    {
        listeners
            .into_iter()
            .map(|(listener, tag)| {
                self.register_with(listener, RegistrationMeta::new().with_optional_tag(tag))
            })
            .collect()
    }

    /// Remove a listener from every interface and tag.
    ///
    /// Returns `false` if it was not registered.
    pub fn unregister<L: ?Sized>(&self, listener: &Arc<L>) -> bool {
        self.unregister_id(ListenerId::of(listener))
    }

    /// Remove a listener by id.
    pub fn unregister_id(&self, id: ListenerId) -> bool {
        self.inner.registry.unregister(id)
    }

    /// Remove several listeners. Returns how many were registered.
    pub fn unregister_all<T>(&self, ids: T) -> usize
    where
        T: IntoIterator<Item = ListenerId>,
    {
        self.inner.registry.unregister_all(ids)
    }

    /// Remove every listener. Returns the number of registrations removed.
    pub fn clear(&self) -> usize {
        self.inner.registry.clear()
    }

    /// Whether the listener is registered.
    pub fn contains<L: ?Sized>(&self, listener: &Arc<L>) -> bool {
        self.inner.registry.contains(ListenerId::of(listener))
    }

    /// Proxy for interface `I`.
    ///
    /// With a tag, calls reach only listeners registered under that tag;
    /// with `None`, every listener of `I`.
    pub fn of<'a, I>(&self, tag: impl Into<Option<&'a str>>) -> Proxy<I>
    where
        I: Interface + ?Sized,
    {
        Proxy::new(self.clone(), tag.into().map(Arc::from))
    }

    /// Proxy for interface `I` reaching every listener regardless of tag.
    pub fn of_any<I: Interface + ?Sized>(&self) -> Proxy<I> {
        Proxy::new(self.clone(), None)
    }

    /// Collection-style view over the registrations.
    pub fn listeners(&self) -> Listeners<'_> {
        Listeners { hub: self }
    }

    /// The listener registry.
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// The delivery scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Stop the hub's own worker pool after it drains its queues.
    ///
    /// Deferred deliveries dispatched afterwards are rejected with
    /// [`SchedulerError::ShutDown`](courier_core::SchedulerError::ShutDown).
    /// Has no effect on an injected executor.
    pub fn shutdown(&self) {
        if let Some(pool) = &self.inner.pool {
            pool.shutdown();
        }
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("registry", &self.inner.registry)
            .field("pool", &self.inner.pool)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Hub`].
///
/// # Example
///
/// ```rust,ignore
/// let hub = Hub::builder()
///     .pool_config(PoolConfig::default().workers(2).queue_capacity(64))
///     .observer(|failure: &DeliveryFailure| eprintln!("{failure}"))
///     .build()?;
/// ```
#[derive(Default)]
pub struct HubBuilder {
    executor: Option<Arc<dyn Executor>>,
    pool_config: Option<PoolConfig>,
    observer: Option<Arc<dyn FailureObserver>>,
}

impl HubBuilder {
    /// Run deferred deliveries on `executor` instead of a worker pool.
    pub fn executor<E: Executor>(mut self, executor: E) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Configure the default worker pool. Ignored when an executor is set.
    pub fn pool_config(mut self, config: PoolConfig) -> Self {
        self.pool_config = Some(config);
        self
    }

    /// Receive failures of deferred deliveries and of calls that cannot
    /// return an error.
    pub fn observer<O: FailureObserver>(mut self, observer: O) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Build the hub, starting the worker pool if needed.
    pub fn build(self) -> Result<Hub, CourierError> {
        let observer: Arc<dyn FailureObserver> = match self.observer {
            Some(observer) => observer,
            None => Arc::new(LoggingObserver),
        };

        let (executor, pool) = match self.executor {
            Some(executor) => {
                if self.pool_config.is_some() {
                    debug!("executor injected, ignoring pool configuration");
                }
                (executor, None)
            }
            None => {
                let pool = Arc::new(WorkerPool::new(self.pool_config.unwrap_or_default())?);
                let executor: Arc<dyn Executor> = pool.clone();
                (executor, Some(pool))
            }
        };

        Ok(Hub {
            inner: Arc::new(HubInner {
                registry: Registry::new(),
                scheduler: Scheduler::new(executor, observer),
                pool,
            }),
        })
    }
}

impl std::fmt::Debug for HubBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubBuilder")
            .field("executor", &self.executor.is_some())
            .field("pool_config", &self.pool_config)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// A collection-style view of a hub's registrations.
///
/// ```rust,ignore
/// hub.listeners().add(&toolbar)?;
/// hub.listeners().remove(&toolbar);
/// ```
#[derive(Clone, Copy)]
pub struct Listeners<'a> {
    hub: &'a Hub,
}

impl Listeners<'_> {
    /// Register a listener without a tag.
    pub fn add<L: Listener>(&self, listener: &Arc<L>) -> Result<ListenerId, RegistryError> {
        self.hub.register(listener)
    }

    /// Register a listener under `tag`.
    pub fn add_tagged<L: Listener>(
        &self,
        listener: &Arc<L>,
        tag: &str,
    ) -> Result<ListenerId, RegistryError> {
        self.hub.register_tagged(listener, tag)
    }

    /// Remove a listener.
    pub fn remove<L: ?Sized>(&self, listener: &Arc<L>) -> bool {
        self.hub.unregister(listener)
    }

    /// Remove several listeners. Returns how many were registered.
    pub fn remove_all<T>(&self, ids: T) -> usize
    where
        T: IntoIterator<Item = ListenerId>,
    {
        self.hub.unregister_all(ids)
    }

    /// Remove every listener.
    pub fn clear(&self) -> usize {
        self.hub.clear()
    }

    /// Whether the listener is registered.
    pub fn contains<L: ?Sized>(&self, listener: &Arc<L>) -> bool {
        self.hub.contains(listener)
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.hub.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.hub.is_empty()
    }
}

impl std::fmt::Debug for Listeners<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.hub.registry().entries()).finish()
    }
}
