//! # Listeners and Capabilities
//!
//! A listener is a caller-owned object (`Arc<L>`) implementing one or more
//! listener interfaces. Which interfaces it satisfies is declared once, at
//! registration time, through [`Listener::capabilities`]; the dispatcher
//! never inspects types at runtime.
//!
//! The dispatcher holds listeners through [`InterfaceHandle`]s, which wrap
//! `Weak` references. Dropping the last `Arc` releases the listener even if
//! it was never unregistered.

use crate::descriptor::{DeliveryMode, Interface};
use std::{
    any::{Any, TypeId},
    sync::{Arc, Weak},
};

/// Identity of a listener instance: the address of its `Arc` allocation.
///
/// Two clones of the same `Arc` share an id; two distinct instances never
/// do while both are alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(usize);

impl ListenerId {
    /// Identity of the listener behind `listener`.
    pub fn of<L: ?Sized>(listener: &Arc<L>) -> Self {
        Self(Arc::as_ptr(listener) as *const () as usize)
    }

    /// The raw address, for hashing and sharding.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl<L: ?Sized> From<&Arc<L>> for ListenerId {
    fn from(listener: &Arc<L>) -> Self {
        Self::of(listener)
    }
}

/// A concrete consumer that can be registered with a dispatcher.
///
/// Usually derived:
///
/// ```rust,ignore
/// #[derive(courier::Listener)]
/// #[listener(implements(Click, AsyncClick), deferred)]
/// struct Toolbar;
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a Courier listener",
    label = "missing `Listener` implementation",
    note = "Derive `courier::Listener` and list the interfaces with `#[listener(implements(..))]`."
)]
pub trait Listener: Send + Sync + 'static {
    /// Declare the interfaces this listener satisfies.
    fn capabilities(caps: &mut Capabilities<Self>)
    where
        Self: Sized;

    /// Delivery mode of this listener, read once at registration.
    fn delivery_mode(&self) -> DeliveryMode {
        DeliveryMode::Sync
    }

    /// Name used in logs and failure reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A type-erased `Weak<I>` for one interface `I` of a listener.
pub struct InterfaceHandle {
    interface: TypeId,
    name: &'static str,
    weak: Box<dyn Any + Send + Sync>,
}

impl InterfaceHandle {
    /// Erase a weak interface handle.
    pub fn new<I: Interface + ?Sized>(weak: Weak<I>) -> Self {
        Self {
            interface: TypeId::of::<I>(),
            name: I::NAME,
            weak: Box::new(weak),
        }
    }

    /// `TypeId` of the interface (`dyn Trait`).
    pub fn interface(&self) -> TypeId {
        self.interface
    }

    /// Interface name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The weak handle, if this handle is for interface `I`.
    pub fn downcast<I: Interface + ?Sized>(&self) -> Option<&Weak<I>> {
        self.weak.downcast_ref::<Weak<I>>()
    }

    /// Upgrade to a strong handle, if this handle is for `I` and the
    /// listener is still alive.
    pub fn upgrade<I: Interface + ?Sized>(&self) -> Option<Arc<I>> {
        self.downcast::<I>()?.upgrade()
    }
}

impl std::fmt::Debug for InterfaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceHandle")
            .field("interface", &self.name)
            .finish_non_exhaustive()
    }
}

/// The set of interfaces a listener declares, resolved against one
/// listener instance.
pub struct Capabilities<L> {
    listener: Weak<L>,
    handles: Vec<InterfaceHandle>,
}

impl<L: Listener> Capabilities<L> {
    /// Resolve the capabilities of `listener` by calling
    /// [`Listener::capabilities`].
    pub fn of(listener: &Arc<L>) -> Self {
        let mut caps = Self {
            listener: Arc::downgrade(listener),
            handles: Vec::new(),
        };
        L::capabilities(&mut caps);
        caps
    }

    /// Declare that the listener implements interface `I`.
    ///
    /// `cast` turns the weak listener into a weak interface handle; it is
    /// an unsizing coercion in practice:
    ///
    /// ```rust,ignore
    /// caps.implements::<dyn Click>(|listener| {
    ///     let handle: Weak<dyn Click> = listener;
    ///     handle
    /// });
    /// ```
    ///
    /// Declaring the same interface twice has no further effect.
    pub fn implements<I>(&mut self, cast: impl FnOnce(Weak<L>) -> Weak<I>) -> &mut Self
    where
        I: Interface + ?Sized,
    {
        if !self.contains::<I>() {
            let handle = cast(self.listener.clone());
            self.handles.push(InterfaceHandle::new(handle));
        }
        self
    }

    /// A weak, type-erased reference used to check whether the listener
    /// is still alive.
    pub fn liveness(&self) -> Weak<dyn Any + Send + Sync> {
        let weak: Weak<dyn Any + Send + Sync> = self.listener.clone();
        weak
    }
}

impl<L> Capabilities<L> {
    /// Whether interface `I` was declared.
    pub fn contains<I: Interface + ?Sized>(&self) -> bool {
        let id = TypeId::of::<I>();
        self.handles.iter().any(|handle| handle.interface == id)
    }

    /// Number of declared interfaces.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no interface was declared.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Names of the declared interfaces, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handles.iter().map(InterfaceHandle::name)
    }

    /// Consume the set, returning the erased handles.
    pub fn into_handles(self) -> Vec<InterfaceHandle> {
        self.handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::MethodDescriptor;

    trait Ping: Send + Sync {
        fn ping(&self) -> u32;
    }

    trait Pong: Send + Sync {}

    impl Interface for dyn Ping {
        const NAME: &'static str = "Ping";
        const METHODS: &'static [MethodDescriptor] = &[MethodDescriptor::dispatchable("ping")];
    }

    impl Interface for dyn Pong {
        const NAME: &'static str = "Pong";
        const METHODS: &'static [MethodDescriptor] = &[];
    }

    struct Paddle(u32);

    impl Ping for Paddle {
        fn ping(&self) -> u32 {
            self.0
        }
    }

    impl Listener for Paddle {
        fn capabilities(caps: &mut Capabilities<Self>) {
            caps.implements::<dyn Ping>(|listener| {
                let handle: Weak<dyn Ping> = listener;
                handle
            });
            // Declared twice on purpose.
            caps.implements::<dyn Ping>(|listener| {
                let handle: Weak<dyn Ping> = listener;
                handle
            });
        }
    }

    #[test]
    fn test_capabilities_resolve() {
        let paddle = Arc::new(Paddle(7));
        let caps = Capabilities::of(&paddle);

        assert_eq!(caps.len(), 1);
        assert!(caps.contains::<dyn Ping>());
        assert!(!caps.contains::<dyn Pong>());
        assert_eq!(caps.names().collect::<Vec<_>>(), vec!["Ping"]);

        let handles = caps.into_handles();
        let ping = handles[0].upgrade::<dyn Ping>().expect("alive");
        assert_eq!(ping.ping(), 7);
        assert!(handles[0].upgrade::<dyn Pong>().is_none());
    }

    #[test]
    fn test_handles_do_not_keep_listener_alive() {
        let paddle = Arc::new(Paddle(1));
        let caps = Capabilities::of(&paddle);
        let liveness = caps.liveness();
        let handles = caps.into_handles();

        assert_eq!(Arc::strong_count(&paddle), 1);
        drop(paddle);

        assert!(handles[0].upgrade::<dyn Ping>().is_none());
        assert_eq!(liveness.strong_count(), 0);
    }

    #[test]
    fn test_listener_id_identity() {
        let a = Arc::new(Paddle(1));
        let b = Arc::new(Paddle(1));
        assert_eq!(ListenerId::of(&a), ListenerId::of(&a.clone()));
        assert_ne!(ListenerId::of(&a), ListenerId::of(&b));
        assert_eq!(ListenerId::from(&a), ListenerId::of(&a));
    }
}
