//! # courier - Interface-Routed Event Dispatch
//!
//! `courier` delivers calls made on a listener interface to every object
//! registered for that interface. Callers never hold references to their
//! consumers: they ask the [`Hub`] for a [`Proxy`] of the interface,
//! optionally narrowed to a tag, and call methods on it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//! use std::sync::Arc;
//!
//! #[courier::listener]
//! pub trait Click {
//!     fn on_click(&self, x: i32);
//! }
//!
//! #[derive(Listener)]
//! #[listener(implements(Click))]
//! struct Toolbar;
//!
//! impl Click for Toolbar {
//!     fn on_click(&self, x: i32) {
//!         println!("clicked at {x}");
//!     }
//! }
//!
//! let hub = Hub::new()?;
//! let toolbar = Arc::new(Toolbar);
//! hub.register_tagged(&toolbar, "main")?;
//!
//! hub.of::<dyn Click>("main").on_click(3);
//! ```
//!
//! ## Delivery
//!
//! Each listener declares a [`DeliveryMode`]. `Sync` listeners run on the
//! calling thread before the proxy call returns; `Deferred` listeners run
//! later on the hub's executor, one at a time and in call order per
//! listener. A method can force its own mode with
//! `#[courier(deliver = "...")]`.
//!
//! ## Ownership
//!
//! The hub holds listeners weakly. Dropping the last `Arc` to a listener
//! removes it from dispatch even without unregistering it.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Generated code refers to `::courier`, including inside this crate's tests.
extern crate self as courier;

mod hub;
mod proxy;
mod scheduler;

pub use hub::{Hub, HubBuilder, Listeners};
pub use proxy::Proxy;
pub use scheduler::{Invocation, Scheduler};

pub use courier_core::{
    // Error types
    BoxError,
    // Listener
    Capabilities,
    CourierError,
    // Jobs
    Delivery,
    DeliveryFailure,
    // Interface
    DeliveryMode,
    DispatchError,
    Executor,
    FailureKind,
    // Observer
    FailureObserver,
    Interface,
    InterfaceHandle,
    Job,
    JobState,
    Listener,
    ListenerId,
    MethodDescriptor,
    RegistryError,
    SchedulerError,
};

pub use courier_std::{ListenerEntry, RegistrationMeta, Registry};

/// Background executors for deferred delivery.
pub mod executors {
    #[cfg(feature = "tokio")]
    pub use courier_std::TokioExecutor;
    pub use courier_std::{InlineExecutor, PoolConfig, WorkerPool};
}

/// Failure observers.
pub mod observers {
    pub use courier_std::LoggingObserver;
}

/// Testing utilities.
pub mod testing {
    pub use courier_std::testing::{
        Call, CallLog, ManualExecutor, RecordedFailure, RecordingObserver, RejectingExecutor,
    };
}

/// Prelude module - common imports for Courier.
///
/// # Usage
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BoxError, CourierError, DeliveryFailure, DeliveryMode, DispatchError, Hub, Interface,
        Listener, Proxy, RegistrationMeta,
    };
}

#[cfg(feature = "macros")]
pub use courier_macros::{Listener, listener};
