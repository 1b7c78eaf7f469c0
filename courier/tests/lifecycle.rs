//! Registration, unregistration and listener ownership.

mod common;

use common::{Click, DeferredSpy, Scroll, Spy};
use courier::{
    Capabilities, DeliveryMode, Hub, Listener, ListenerId, RegistrationMeta, RegistryError,
    executors::InlineExecutor, testing::CallLog,
};
use std::sync::Arc;

fn hub() -> Hub {
    Hub::builder().executor(InlineExecutor).build().unwrap()
}

#[test]
fn test_unregister_removes_listener_everywhere() {
    let hub = hub();
    let log = CallLog::new();
    let spy = Arc::new(Spy::new("s", &log));
    hub.register(&spy).unwrap();
    hub.register_tagged(&spy, "t").unwrap();
    assert_eq!(hub.len(), 2);

    assert!(hub.unregister(&spy));
    assert!(!hub.contains(&spy));

    hub.of_any::<dyn Click>().on_click(1);
    hub.of::<dyn Scroll>("t").on_scroll(1);
    assert!(log.is_empty());

    // Already gone.
    assert!(!hub.unregister(&spy));
}

#[test]
fn test_unregister_all_and_clear() {
    let hub = hub();
    let log = CallLog::new();
    let a = Arc::new(Spy::new("a", &log));
    let b = Arc::new(Spy::new("b", &log));
    let c = Arc::new(Spy::new("c", &log));
    let stranger = Arc::new(Spy::new("x", &log));

    let ids = hub
        .register_all([(&a, None), (&b, Some("t")), (&c, Some("t"))])
        .unwrap();
    assert_eq!(ids, vec![ListenerId::of(&a), ListenerId::of(&b), ListenerId::of(&c)]);

    let removed = hub.unregister_all([ListenerId::of(&a), ListenerId::of(&stranger)]);
    assert_eq!(removed, 1);
    assert_eq!(hub.of::<dyn Click>("t").listener_count(), 2);

    assert_eq!(hub.clear(), 2);
    assert!(hub.is_empty());
    hub.of_any::<dyn Click>().on_click(1);
    assert!(log.is_empty());
}

#[test]
fn test_registry_does_not_keep_listeners_alive() {
    let hub = hub();
    let log = CallLog::new();
    let spy = Arc::new(Spy::new("s", &log));
    hub.register(&spy).unwrap();
    assert_eq!(Arc::strong_count(&spy), 1);

    drop(spy);

    hub.of_any::<dyn Click>().on_click(1);
    assert!(log.is_empty());
    assert!(hub.is_empty());
}

#[test]
fn test_dropped_listeners_do_not_count_as_removed() {
    let hub = hub();
    let log = CallLog::new();
    let gone = Arc::new(Spy::new("gone", &log));
    hub.register(&gone).unwrap();
    drop(gone);

    let stranger = Arc::new(Spy::new("x", &log));
    assert!(!hub.unregister(&stranger));

    let gone = Arc::new(Spy::new("gone", &log));
    hub.register_tagged(&gone, "t").unwrap();
    drop(gone);
    assert_eq!(hub.len(), 0);
    assert_eq!(hub.clear(), 0);
}

#[test]
fn test_reregistration_replaces_in_place() {
    let hub = Hub::builder()
        .executor(courier::testing::ManualExecutor::new())
        .build()
        .unwrap();
    let log = CallLog::new();
    let first = Arc::new(Spy::new("first", &log));
    let second = Arc::new(Spy::new("second", &log));
    hub.register_tagged(&first, "t").unwrap();
    hub.register_tagged(&second, "t").unwrap();

    // Same listener and tag: keeps its slot, takes the new mode.
    hub.register_with(
        &first,
        RegistrationMeta::tagged("t").with_delivery(DeliveryMode::Deferred),
    )
    .unwrap();
    assert_eq!(hub.len(), 2);

    let entries = hub.registry().lookup::<dyn Click>(Some("t"));
    assert_eq!(entries[0].id(), ListenerId::of(&first));
    assert_eq!(entries[0].delivery_mode(), DeliveryMode::Deferred);
    assert_eq!(entries[1].id(), ListenerId::of(&second));
}

#[test]
fn test_listener_under_several_tags() {
    let hub = hub();
    let log = CallLog::new();
    let spy = Arc::new(Spy::new("s", &log));
    hub.register_tagged(&spy, "x").unwrap();
    hub.register_tagged(&spy, "y").unwrap();

    hub.of_any::<dyn Click>().on_click(0);
    assert_eq!(log.labels(), vec!["s:on_click 0"]);

    hub.of::<dyn Click>("x").on_click(1);
    hub.of::<dyn Click>("y").on_click(2);
    assert_eq!(
        log.labels(),
        vec!["s:on_click 0", "s:on_click 1", "s:on_click 2"]
    );
}

#[test]
fn test_listeners_view() {
    let hub = hub();
    let log = CallLog::new();
    let spy = Arc::new(Spy::new("s", &log));
    let deferred = Arc::new(DeferredSpy::new("d", &log));
    let listeners = hub.listeners();

    listeners.add(&spy).unwrap();
    listeners.add_tagged(&deferred, "bg").unwrap();
    assert_eq!(listeners.len(), 2);
    assert!(listeners.contains(&deferred));

    assert!(listeners.remove(&spy));
    assert!(!listeners.contains(&spy));
    assert_eq!(listeners.remove_all([ListenerId::of(&deferred)]), 1);
    assert!(listeners.is_empty());

    listeners.add(&spy).unwrap();
    assert_eq!(listeners.clear(), 1);
}

struct Mute;

impl Listener for Mute {
    fn capabilities(_caps: &mut Capabilities<Self>) {}

    fn name(&self) -> &'static str {
        "mute"
    }
}

#[test]
fn test_listener_without_interfaces_is_rejected() {
    let hub = hub();
    let mute = Arc::new(Mute);

    assert_eq!(hub.register(&mute), Err(RegistryError::NoInterfaces("mute")));
    assert!(hub.is_empty());
}

#[test]
fn test_hubs_are_independent() {
    let left = hub();
    let right = hub();
    let log = CallLog::new();
    let spy = Arc::new(Spy::new("s", &log));
    left.register(&spy).unwrap();

    right.of_any::<dyn Click>().on_click(1);
    assert!(log.is_empty());
    assert!(right.is_empty());

    left.of_any::<dyn Click>().on_click(2);
    assert_eq!(log.labels(), vec!["s:on_click 2"]);
}

#[test]
fn test_hub_clones_share_registrations() {
    let hub = hub();
    let clone = hub.clone();
    let log = CallLog::new();
    let spy = Arc::new(Spy::new("s", &log));
    clone.register(&spy).unwrap();

    hub.of_any::<dyn Click>().on_click(3);
    assert_eq!(log.labels(), vec!["s:on_click 3"]);
}
