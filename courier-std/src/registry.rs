//! Registry module for listener management.
//!
//! The registry is the only shared mutable state of a dispatcher. It keeps
//! an ordered list of [`ListenerEntry`]s behind a `parking_lot::RwLock`:
//! mutation takes the write lock, lookups take the read lock just long
//! enough to copy out a snapshot of `Arc`s, so delivery never runs while
//! the lock is held.
//!
//! # Keying
//!
//! An entry is keyed by `(listener, tag)` and lists every interface the
//! listener declared. Registering the same listener again with the same
//! tag replaces the entry in place: it keeps its dispatch position and
//! picks up the new capabilities and delivery mode. A different tag adds a
//! separate entry.

use courier_core::{
    Capabilities, DeliveryMode, Interface, InterfaceHandle, Listener, ListenerId, RegistryError,
};
use parking_lot::RwLock;
use std::{
    any::{Any, TypeId},
    collections::HashSet,
    sync::{Arc, Weak},
};
use tracing::{debug, trace};

/// Options attached to one registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationMeta {
    /// Tag qualifying the listener. `None` registers it untagged.
    pub tag: Option<Arc<str>>,
    /// Overrides the delivery mode the listener declares.
    pub delivery: Option<DeliveryMode>,
}

impl RegistrationMeta {
    /// Untagged registration with the listener's own delivery mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registration under `tag`.
    pub fn tagged(tag: impl Into<Arc<str>>) -> Self {
        Self::new().with_tag(tag)
    }

    /// Set the tag.
    pub fn with_tag(mut self, tag: impl Into<Arc<str>>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set an optional tag.
    pub fn with_optional_tag(mut self, tag: Option<&str>) -> Self {
        self.tag = tag.map(Arc::from);
        self
    }

    /// Override the delivery mode.
    pub fn with_delivery(mut self, mode: DeliveryMode) -> Self {
        self.delivery = Some(mode);
        self
    }
}

/// A registered listener.
pub struct ListenerEntry {
    id: ListenerId,
    name: &'static str,
    tag: Option<Arc<str>>,
    mode: DeliveryMode,
    liveness: Weak<dyn Any + Send + Sync>,
    handles: Vec<InterfaceHandle>,
}

impl ListenerEntry {
    fn new<L: Listener>(listener: &Arc<L>, meta: RegistrationMeta) -> Self {
        let caps = Capabilities::of(listener);
        Self {
            id: ListenerId::of(listener),
            name: listener.name(),
            tag: meta.tag,
            mode: meta.delivery.unwrap_or_else(|| listener.delivery_mode()),
            liveness: caps.liveness(),
            handles: caps.into_handles(),
        }
    }

    /// Identity of the listener.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Listener name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Tag the listener was registered with.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Delivery mode fixed at registration.
    pub fn delivery_mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Whether the listener declared interface `I`.
    pub fn implements<I: Interface + ?Sized>(&self) -> bool {
        self.implements_type(TypeId::of::<I>())
    }

    /// Whether the listener declared the interface with the given `TypeId`.
    pub fn implements_type(&self, interface: TypeId) -> bool {
        self.handles
            .iter()
            .any(|handle| handle.interface() == interface)
    }

    /// Names of the declared interfaces.
    pub fn interfaces(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handles.iter().map(InterfaceHandle::name)
    }

    /// Weak handle to the listener as interface `I`.
    pub fn handle<I: Interface + ?Sized>(&self) -> Option<Weak<I>> {
        self.handles
            .iter()
            .find_map(|handle| handle.downcast::<I>())
            .cloned()
    }

    /// Strong handle to the listener as interface `I`, if it is still alive.
    pub fn upgrade<I: Interface + ?Sized>(&self) -> Option<Arc<I>> {
        self.handles.iter().find_map(|handle| handle.upgrade::<I>())
    }

    /// Whether the caller still holds the listener.
    pub fn is_alive(&self) -> bool {
        self.liveness.strong_count() > 0
    }

    fn matches(&self, interface: TypeId, tag: Option<&str>) -> bool {
        self.implements_type(interface) && tag.is_none_or(|tag| self.tag() == Some(tag))
    }
}

impl std::fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("mode", &self.mode)
            .field("interfaces", &self.interfaces().collect::<Vec<_>>())
            .finish()
    }
}

/// A thread-safe store of registered listeners.
///
/// # Example
/// ```ignore
/// let registry = Registry::new();
/// let toolbar = Arc::new(Toolbar);
/// registry.register(&toolbar, RegistrationMeta::tagged("main"))?;
///
/// for entry in registry.lookup::<dyn Click>(Some("main")) {
///     // ...
/// }
/// ```
#[derive(Default)]
pub struct Registry {
    entries: RwLock<Vec<Arc<ListenerEntry>>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` under every interface it declares.
    ///
    /// Re-registering the same listener with the same tag replaces the
    /// existing entry in place. Returns the listener's id.
    pub fn register<L: Listener>(
        &self,
        listener: &Arc<L>,
        meta: RegistrationMeta,
    ) -> Result<ListenerId, RegistryError> {
        // Capabilities run user code; resolve them before taking the lock.
        let entry = ListenerEntry::new(listener, meta);
        if entry.handles.is_empty() {
            return Err(RegistryError::NoInterfaces(entry.name));
        }
        let id = entry.id;

        let mut entries = self.entries.write();
        entries.retain(|existing| existing.is_alive());

        let existing = entries
            .iter()
            .position(|existing| existing.id == id && existing.tag == entry.tag);
        debug!(
            listener = entry.name,
            tag = ?entry.tag,
            mode = %entry.mode,
            interfaces = entry.handles.len(),
            replaced = existing.is_some(),
            "registered listener"
        );
        match existing {
            Some(index) => entries[index] = Arc::new(entry),
            None => entries.push(Arc::new(entry)),
        }
        Ok(id)
    }

    /// Remove every entry of the listener, across all interfaces and tags.
    ///
    /// Returns `false` if the listener was not registered.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let removed = entries
            .iter()
            .any(|entry| entry.id == id && entry.is_alive());
        entries.retain(|entry| entry.id != id && entry.is_alive());
        debug!(?id, removed, "unregistered listener");
        removed
    }

    /// Remove several listeners. Unknown ids are skipped.
    ///
    /// Returns how many of the given listeners were registered.
    pub fn unregister_all<I>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = ListenerId>,
    {
        let ids: HashSet<ListenerId> = ids.into_iter().collect();
        let mut entries = self.entries.write();
        let removed: HashSet<ListenerId> = entries
            .iter()
            .filter(|entry| ids.contains(&entry.id) && entry.is_alive())
            .map(|entry| entry.id)
            .collect();
        entries.retain(|entry| !ids.contains(&entry.id) && entry.is_alive());
        debug!(requested = ids.len(), removed = removed.len(), "unregistered listeners");
        removed.len()
    }

    /// Remove every entry. Returns the number of live entries removed.
    pub fn clear(&self) -> usize {
        let removed = std::mem::take(&mut *self.entries.write())
            .iter()
            .filter(|entry| entry.is_alive())
            .count();
        debug!(removed, "cleared registry");
        removed
    }

    /// Snapshot of the listeners registered for interface `I`.
    ///
    /// With a tag, only entries registered under that tag match. Without
    /// one, every entry for `I` matches, and a listener registered under
    /// several tags appears once, at its first position. Listeners that
    /// have been dropped are skipped.
    pub fn lookup<I: Interface + ?Sized>(&self, tag: Option<&str>) -> Vec<Arc<ListenerEntry>> {
        let targets = self.lookup_type(TypeId::of::<I>(), tag);
        trace!(interface = I::NAME, ?tag, matched = targets.len(), "resolved listeners");
        targets
    }

    /// [`lookup`](Registry::lookup) by interface `TypeId`.
    pub fn lookup_type(&self, interface: TypeId, tag: Option<&str>) -> Vec<Arc<ListenerEntry>> {
        let entries = self.entries.read();
        let mut seen = HashSet::new();
        entries
            .iter()
            .filter(|entry| entry.matches(interface, tag) && entry.is_alive())
            .filter(|entry| tag.is_some() || seen.insert(entry.id))
            .cloned()
            .collect()
    }

    /// Whether the listener has at least one entry.
    pub fn contains(&self, id: ListenerId) -> bool {
        self.entries
            .read()
            .iter()
            .any(|entry| entry.id == id && entry.is_alive())
    }

    /// Snapshot of every live entry, in registration order.
    pub fn entries(&self) -> Vec<Arc<ListenerEntry>> {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.is_alive())
            .cloned()
            .collect()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.is_alive())
            .count()
    }

    /// Check if the registry has no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &*self.entries.read())
            .finish()
    }
}
