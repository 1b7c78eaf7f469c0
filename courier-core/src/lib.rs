//! # courier-core
//!
//! Core traits for the Courier event dispatcher.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! hosts and extensions that only need the vocabulary types, without the
//! `courier-std` registry and worker pool.
//!
//! # Building Blocks
//!
//! ## Interfaces ([`Interface`])
//!
//! A listener interface is a trait. Its trait object type (`dyn Click`)
//! implements [`Interface`], which carries the static method table: for
//! each method, whether a proxy may forward it and how it should be
//! delivered.
//!
//! ## Listeners ([`Listener`])
//!
//! Concrete consumers declare which interfaces they satisfy through
//! [`Capabilities`], once, at registration time. The dispatcher only ever
//! keeps weak handles to them.
//!
//! ## Delivery ([`Executor`], [`Job`])
//!
//! A dispatched call becomes a [`Job`]. `Sync` jobs run on the caller's
//! thread; `Deferred` jobs are handed to an injected [`Executor`].
//! Failures that cannot reach the caller go to a [`FailureObserver`].
//!
//! # Error Types
//!
//! - [`CourierError`] - Top-level error type
//! - [`DispatchError`] - Errors surfaced by a proxy call
//! - [`DeliveryFailure`] - One listener's failed delivery
//! - [`SchedulerError`] - Deferred delivery rejected by an executor

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod descriptor;
mod error;
mod executor;
mod listener;
mod observer;

// Re-exports
pub use descriptor::{DeliveryMode, Interface, MethodDescriptor};
pub use error::{
    BoxError, CourierError, DeliveryFailure, DispatchError, FailureKind, RegistryError,
    SchedulerError,
};
pub use executor::{Delivery, Executor, Job, JobState};
pub use listener::{Capabilities, InterfaceHandle, Listener, ListenerId};
pub use observer::FailureObserver;
