//! Dedicated worker threads.
//!
//! Each worker owns one bounded queue. A listener always maps to the same
//! worker, so its deferred deliveries run one after another in submission
//! order, while different listeners proceed in parallel.

use super::shard_of;
use courier_core::{Executor, Job, ListenerId, SchedulerError};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::{Mutex, RwLock};
use std::{
    num::NonZeroUsize,
    thread::{self, JoinHandle},
};
use tracing::{debug, trace, warn};

const DEFAULT_MAX_WORKERS: usize = 4;
const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Configuration of a [`WorkerPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Capacity of each worker's queue.
    pub queue_capacity: usize,
    /// Thread name prefix; workers are named `{thread_name}-{index}`.
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let workers = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
            .min(DEFAULT_MAX_WORKERS);
        Self {
            workers,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            thread_name: "courier-worker".to_owned(),
        }
    }
}

impl PoolConfig {
    /// Set the number of worker threads. Zero is treated as one.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the capacity of each worker's queue. Zero is treated as one.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the thread name prefix.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

/// A fixed set of worker threads, each draining its own bounded queue.
///
/// Dropping the pool shuts it down: queued jobs still run, then the
/// workers exit and are joined.
pub struct WorkerPool {
    config: PoolConfig,
    senders: RwLock<Vec<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Start the worker threads.
    pub fn new(config: PoolConfig) -> Result<Self, SchedulerError> {
        let config = PoolConfig {
            workers: config.workers.max(1),
            queue_capacity: config.queue_capacity.max(1),
            ..config
        };

        let mut senders = Vec::with_capacity(config.workers);
        let mut workers = Vec::with_capacity(config.workers);
        for index in 0..config.workers {
            let (sender, receiver) = bounded(config.queue_capacity);
            let handle = thread::Builder::new()
                .name(format!("{}-{index}", config.thread_name))
                .spawn(move || work(receiver))
                .map_err(SchedulerError::Spawn)?;
            senders.push(sender);
            workers.push(handle);
        }

        debug!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "started worker pool"
        );
        Ok(Self {
            config,
            senders: RwLock::new(senders),
            workers: Mutex::new(workers),
        })
    }

    /// Start a pool with [`PoolConfig::default`].
    pub fn with_defaults() -> Result<Self, SchedulerError> {
        Self::new(PoolConfig::default())
    }

    /// The effective configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of jobs waiting in the queues.
    pub fn queued(&self) -> usize {
        self.senders.read().iter().map(Sender::len).sum()
    }

    /// Whether [`shutdown`](WorkerPool::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.senders.read().is_empty()
    }

    /// Stop accepting jobs, let the workers drain their queues, and join
    /// them. Calling it again has no effect.
    ///
    /// When called from one of the pool's own workers, that worker is not
    /// joined; it exits once its current job returns.
    pub fn shutdown(&self) {
        let closed = std::mem::take(&mut *self.senders.write());
        if closed.is_empty() {
            return;
        }
        drop(closed);

        let current = thread::current().id();
        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!("worker thread panicked during shutdown");
            }
        }
        debug!("worker pool shut down");
    }
}

impl Executor for WorkerPool {
    fn execute(&self, key: ListenerId, job: Job) -> Result<(), SchedulerError> {
        let senders = self.senders.read();
        if senders.is_empty() {
            return Err(SchedulerError::ShutDown);
        }
        let shard = shard_of(key, senders.len());
        match senders[shard].try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) => {
                warn!(
                    listener = job.delivery().listener,
                    method = job.delivery().method,
                    shard,
                    capacity = self.config.queue_capacity,
                    "worker queue full, rejecting deferred delivery"
                );
                Err(SchedulerError::Saturated {
                    capacity: self.config.queue_capacity,
                })
            }
            Err(TrySendError::Disconnected(_)) => Err(SchedulerError::ShutDown),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

fn work(receiver: Receiver<Job>) {
    // `iter` keeps yielding queued jobs after the senders are gone.
    for job in receiver.iter() {
        let delivery = *job.delivery();
        let state = job.run();
        trace!(
            listener = delivery.listener,
            interface = delivery.interface,
            method = delivery.method,
            ?state,
            "deferred delivery finished"
        );
    }
}
