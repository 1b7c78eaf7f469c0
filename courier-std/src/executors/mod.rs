//! Background execution contexts for deferred deliveries.
//!
//! All executors share one contract: jobs submitted with the same listener
//! key run in submission order, and a full queue rejects the job instead of
//! blocking the dispatching thread.

mod inline;
mod pool;
#[cfg(feature = "tokio")]
mod tokio;

pub use inline::InlineExecutor;
pub use pool::{PoolConfig, WorkerPool};
#[cfg(feature = "tokio")]
pub use self::tokio::TokioExecutor;

use courier_core::ListenerId;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Pick the queue for `key` among `shards` queues.
pub(crate) fn shard_of(key: ListenerId, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % shards.max(1) as u64) as usize
}
