//! Durable per-thread loop state.

pub mod file;
pub mod memory;

pub use file::FileCheckpointStore;
pub use memory::MemoryCheckpointStore;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent_loop::{AgentState, LoopStep};
use crate::error::{Result, SwitchyardError};

pub const THREAD_ID_PREFIX: &str = "thread_";
pub const THREAD_ID_HEX_LEN: usize = 16;

/// Fresh collision-resistant thread id: `thread_` plus 16 lowercase hex chars.
pub fn new_thread_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{THREAD_ID_PREFIX}{}", &hex[..THREAD_ID_HEX_LEN])
}

/// Snapshot of a thread taken after one loop transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: String,
    pub checkpoint_id: Uuid,
    /// Monotonic per thread, starting at 1.
    pub seq: u64,
    /// Step the loop was about to enter when the snapshot was taken.
    pub step: LoopStep,
    pub state: AgentState,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Snapshot following the one numbered `previous_seq` (0 for none).
    pub(crate) fn next(previous_seq: u64, step: LoopStep, state: &AgentState) -> Self {
        Self {
            thread_id: state.thread_id.clone(),
            checkpoint_id: Uuid::new_v4(),
            seq: previous_seq + 1,
            step,
            state: state.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Storage for checkpoints, keyed by thread id.
///
/// Writes to one thread are serialized; writes to different threads never
/// block each other. A reader sees either the previous or the new snapshot,
/// never a partial one.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist a new snapshot and return it.
    async fn put(&self, step: LoopStep, state: &AgentState) -> Result<Checkpoint>;

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    async fn get(&self, thread_id: &str, checkpoint_id: Uuid) -> Result<Option<Checkpoint>>;

    /// Every snapshot of a thread, oldest first.
    async fn list(&self, thread_id: &str) -> Result<Vec<Checkpoint>>;

    /// Remove a thread; returns whether anything existed.
    async fn delete(&self, thread_id: &str) -> Result<bool>;

    async fn exists(&self, thread_id: &str) -> Result<bool> {
        Ok(self.latest(thread_id).await?.is_some())
    }

    /// Latest state of a thread, or `ThreadNotFound`.
    async fn load_state(&self, thread_id: &str) -> Result<AgentState> {
        self.latest(thread_id)
            .await?
            .map(|c| c.state)
            .ok_or_else(|| SwitchyardError::ThreadNotFound(thread_id.to_string()))
    }
}

/// One async mutex per thread id.
#[derive(Debug, Default)]
pub(crate) struct ThreadLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ThreadLocks {
    pub(crate) async fn acquire(&self, thread_id: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(map.entry(thread_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop the entry for a thread nobody holds or waits on.
    pub(crate) fn forget(&self, thread_id: &str) {
        let mut map = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if map.get(thread_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            map.remove(thread_id);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
