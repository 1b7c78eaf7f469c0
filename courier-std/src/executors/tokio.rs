//! Tokio-backed execution.
//!
//! Listener methods are synchronous, so every job runs on the blocking
//! pool through `spawn_blocking`. One drain task per shard awaits each job
//! before taking the next, which keeps per-listener order.

use super::{PoolConfig, shard_of};
use courier_core::{Executor, Job, ListenerId, SchedulerError};
use parking_lot::RwLock;
use tokio::{
    runtime::Handle,
    sync::mpsc::{self, error::TrySendError},
    task,
};
use tracing::{debug, warn};

/// Runs deferred deliveries on a Tokio runtime.
///
/// `PoolConfig::workers` sets the number of shards and
/// `PoolConfig::queue_capacity` the bound of each shard's channel.
/// `thread_name` is not used.
pub struct TokioExecutor {
    capacity: usize,
    senders: RwLock<Vec<mpsc::Sender<Job>>>,
}

impl TokioExecutor {
    /// Spawn the drain tasks on `handle`.
    pub fn new(handle: &Handle, config: &PoolConfig) -> Self {
        let shards = config.workers.max(1);
        let capacity = config.queue_capacity.max(1);
        let senders = (0..shards)
            .map(|_| {
                let (sender, receiver) = mpsc::channel(capacity);
                handle.spawn(drain(receiver));
                sender
            })
            .collect();
        debug!(shards, capacity, "started tokio executor");
        Self {
            capacity,
            senders: RwLock::new(senders),
        }
    }

    /// Spawn the drain tasks on the runtime of the calling context.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn current(config: &PoolConfig) -> Self {
        Self::new(&Handle::current(), config)
    }

    /// Stop accepting jobs. Queued jobs still run.
    pub fn shutdown(&self) {
        self.senders.write().clear();
    }
}

impl Executor for TokioExecutor {
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
                    capacity = self.capacity,
                    "tokio shard full, rejecting deferred delivery"
                );
                Err(SchedulerError::Saturated {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Closed(_)) => Err(SchedulerError::ShutDown),
        }
    }
}

impl std::fmt::Debug for TokioExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioExecutor")
            .field("shards", &self.senders.read().len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

async fn drain(mut receiver: mpsc::Receiver<Job>) {
    while let Some(job) = receiver.recv().await {
        if let Err(error) = task::spawn_blocking(move || job.run()).await {
            warn!(%error, "deferred delivery task was cancelled");
        }
    }
}
