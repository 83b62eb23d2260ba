//! In-process checkpoint store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Checkpoint, CheckpointStore};
use crate::agent_loop::{AgentState, LoopStep};
use crate::error::Result;

/// Keeps every checkpoint in memory; contents die with the process.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    threads: RwLock<HashMap<String, Vec<Checkpoint>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn put(&self, step: LoopStep, state: &AgentState) -> Result<Checkpoint> {
        let mut threads = self.threads.write().await;
        let history = threads.entry(state.thread_id.clone()).or_default();
        let checkpoint = Checkpoint::next(history.last().map_or(0, |c| c.seq), step, state);
        history.push(checkpoint.clone());
        Ok(checkpoint)
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).and_then(|h| h.last().cloned()))
    }

    async fn get(&self, thread_id: &str, checkpoint_id: Uuid) -> Result<Option<Checkpoint>> {
        let threads = self.threads.read().await;
        Ok(threads
            .get(thread_id)
            .and_then(|h| h.iter().find(|c| c.checkpoint_id == checkpoint_id).cloned()))
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<Checkpoint>> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).cloned().unwrap_or_default())
    }

    async fn delete(&self, thread_id: &str) -> Result<bool> {
        Ok(self.threads.write().await.remove(thread_id).is_some())
    }
}
