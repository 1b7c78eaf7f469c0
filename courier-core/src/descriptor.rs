//! # Method Eligibility
//!
//! Every listener interface exposes a static table of [`MethodDescriptor`]s.
//! The table is produced once, at compile time, by `#[courier::listener]`
//! and never changes at runtime. A proxy consults it before forwarding a
//! call: only methods marked dispatchable are routed to listeners, every
//! other method is rejected at the proxy boundary.

/// How a dispatched call reaches a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeliveryMode {
    /// Run inline on the calling thread before the proxy call returns.
    #[default]
    Sync,
    /// Queue to a background executor; the caller does not wait.
    Deferred,
}

impl DeliveryMode {
    /// Returns `true` for [`DeliveryMode::Deferred`].
    pub const fn is_deferred(self) -> bool {
        matches!(self, DeliveryMode::Deferred)
    }
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMode::Sync => f.write_str("sync"),
            DeliveryMode::Deferred => f.write_str("deferred"),
        }
    }
}

/// Static description of one interface method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Method name as declared on the trait.
    pub name: &'static str,
    /// Whether a proxy forwards this method to listeners.
    pub dispatchable: bool,
    /// Per-method delivery override. `None` defers to the listener entry.
    pub delivery: Option<DeliveryMode>,
}

impl MethodDescriptor {
    /// A method that proxies forward to listeners.
    pub const fn dispatchable(name: &'static str) -> Self {
        Self {
            name,
            dispatchable: true,
            delivery: None,
        }
    }

    /// A method that proxies reject with `MethodNotDispatchable`.
    pub const fn ignored(name: &'static str) -> Self {
        Self {
            name,
            dispatchable: false,
            delivery: None,
        }
    }

    /// Force a delivery mode for this method, regardless of the listener.
    pub const fn with_delivery(mut self, mode: DeliveryMode) -> Self {
        self.delivery = Some(mode);
        self
    }
}

/// A listener interface, implemented for the trait object type of the
/// interface trait (`impl Interface for dyn Click`).
///
/// Implementations are normally generated by `#[courier::listener]`.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a Courier listener interface",
    label = "missing `Interface` implementation",
    note = "Annotate the trait with `#[courier::listener]` and use it as `dyn Trait`."
)]
pub trait Interface: Send + Sync + 'static {
    /// Interface name used in errors and logs.
    const NAME: &'static str;

    /// The method table, in declaration order.
    const METHODS: &'static [MethodDescriptor];

    /// Descriptor of the method at `index`, in declaration order.
    fn method(index: usize) -> Option<&'static MethodDescriptor> {
        Self::METHODS.get(index)
    }

    /// Look up a method descriptor by name.
    fn find(name: &str) -> Option<&'static MethodDescriptor> {
        Self::METHODS.iter().find(|method| method.name == name)
    }

    /// Whether the named method is forwarded by proxies.
    ///
    /// Unknown methods are never dispatchable.
    fn is_dispatchable(name: &str) -> bool {
        Self::find(name).is_some_and(|method| method.dispatchable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Sample: Send + Sync {}

    impl Interface for dyn Sample {
        const NAME: &'static str = "Sample";
        const METHODS: &'static [MethodDescriptor] = &[
            MethodDescriptor::dispatchable("on_sample"),
            MethodDescriptor::ignored("internal"),
            MethodDescriptor::dispatchable("on_batch").with_delivery(DeliveryMode::Deferred),
        ];
    }

    #[test]
    fn test_is_dispatchable() {
        assert!(<dyn Sample>::is_dispatchable("on_sample"));
        assert!(!<dyn Sample>::is_dispatchable("internal"));
        assert!(!<dyn Sample>::is_dispatchable("missing"));
    }

    #[test]
    fn test_method_by_index() {
        let method = <dyn Sample>::method(2).expect("third method");
        assert_eq!(method.name, "on_batch");
        assert_eq!(method.delivery, Some(DeliveryMode::Deferred));
        assert!(<dyn Sample>::method(3).is_none());
    }

    #[test]
    fn test_delivery_mode_default() {
        assert_eq!(DeliveryMode::default(), DeliveryMode::Sync);
        assert!(DeliveryMode::Deferred.is_deferred());
        assert_eq!(DeliveryMode::Deferred.to_string(), "deferred");
    }
}
