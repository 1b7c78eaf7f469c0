//! Concurrent registration and dispatch from many threads.

mod common;

use common::{Click, DeferredSpy, Spy, WAIT};
use courier::{
    Hub,
    executors::PoolConfig,
    testing::{CallLog, RecordingObserver},
};
use std::{sync::Arc, thread};

const THREADS: usize = 8;
const ROUNDS: usize = 1_250;

#[test]
fn test_concurrent_register_dispatch_unregister() {
    common::init_tracing();
    let observer = RecordingObserver::new();
    let hub = Hub::builder()
        .pool_config(PoolConfig::default().workers(4).queue_capacity(THREADS * ROUNDS))
        .observer(observer.clone())
        .build()
        .unwrap();
    let log = CallLog::new();

    // Stays registered throughout and must see every dispatch.
    let anchor = Arc::new(Spy::new("anchor", &log));
    hub.register_tagged(&anchor, "anchor").unwrap();

    thread::scope(|scope| {
        for worker in 0..THREADS {
            let hub = hub.clone();
            let log = log.clone();
            scope.spawn(move || {
                let tag = format!("worker-{worker}");
                for round in 0..ROUNDS {
                    let spy = Arc::new(Spy::new("transient", &log));
                    hub.register_tagged(&spy, &tag).unwrap();
                    hub.of::<dyn Click>("anchor").on_click(round as i32);
                    hub.of::<dyn Click>(tag.as_str()).on_click(round as i32);
                    assert!(hub.unregister(&spy));
                }
            });
        }
    });

    let anchor_calls = log
        .labels()
        .iter()
        .filter(|label| label.starts_with("anchor:"))
        .count();
    assert_eq!(anchor_calls, THREADS * ROUNDS);

    let transient_calls = log
        .labels()
        .iter()
        .filter(|label| label.starts_with("transient:"))
        .count();
    assert_eq!(transient_calls, THREADS * ROUNDS);

    assert_eq!(hub.len(), 1);
    assert_eq!(observer.count(), 0);
}

#[test]
fn test_concurrent_deferred_dispatch_keeps_per_listener_order() {
    let hub = Hub::builder()
        .pool_config(PoolConfig::default().workers(4).queue_capacity(THREADS * ROUNDS))
        .build()
        .unwrap();

    let logs: Vec<CallLog> = (0..THREADS).map(|_| CallLog::new()).collect();
    let listeners: Vec<_> = logs
        .iter()
        .map(|log| Arc::new(DeferredSpy::new("d", log)))
        .collect();
    for (i, listener) in listeners.iter().enumerate() {
        hub.register_tagged(listener, &format!("d{i}")).unwrap();
    }

    thread::scope(|scope| {
        for i in 0..THREADS {
            let proxy = hub.of::<dyn Click>(format!("d{i}").as_str());
            scope.spawn(move || {
                for round in 0..ROUNDS {
                    proxy.on_click(round as i32);
                }
            });
        }
    });

    for log in &logs {
        assert!(log.wait_for(ROUNDS, WAIT));
        let expected: Vec<String> = (0..ROUNDS).map(|i| format!("d:on_click {i}")).collect();
        assert_eq!(log.labels(), expected);
    }
}
