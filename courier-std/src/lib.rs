//! # courier-std
//!
//! Standard implementations for the Courier event dispatcher.
//!
//! This crate provides:
//! - **Registry**: [`Registry`], the thread-safe listener store
//! - **Executors**: [`WorkerPool`], [`InlineExecutor`], and `TokioExecutor`
//!   behind the `tokio` feature
//! - **Observers**: [`LoggingObserver`]
//! - **Testing**: recording observers and controllable executors

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use courier_core;

// Modules
pub mod executors;
pub mod observers;
pub mod registry;
pub mod testing;

pub use executors::{InlineExecutor, PoolConfig, WorkerPool};
#[cfg(feature = "tokio")]
pub use executors::TokioExecutor;
pub use observers::LoggingObserver;
pub use registry::{ListenerEntry, RegistrationMeta, Registry};
