//! Checkpoints as JSON files on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::{Checkpoint, CheckpointStore, ThreadLocks};
use crate::agent_loop::{AgentState, LoopStep};
use crate::config::AppConfig;
use crate::error::{Result, SwitchyardError};

/// File-based checkpoint store.
///
/// Layout:
/// - `<root>/<thread_id>/<seq>-<checkpoint_id>.json`, one file per snapshot
///
/// Each snapshot is written to a temp file and renamed into place, so readers
/// never observe a partial file.
#[derive(Debug)]
pub struct FileCheckpointStore {
    root: PathBuf,
    locks: ThreadLocks,
}

impl FileCheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: ThreadLocks::default(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.checkpoint_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn thread_dir(&self, thread_id: &str) -> Result<PathBuf> {
        let safe = !thread_id.is_empty()
            && thread_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !safe {
            return Err(SwitchyardError::InvalidInput(format!(
                "thread id not usable as a storage key: {thread_id}"
            )));
        }
        Ok(self.root.join(thread_id))
    }

    /// Snapshot file names in seq order.
    async fn entries(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !tokio::fs::try_exists(dir).await.map_err(|e| storage(dir, e))? {
            return Ok(Vec::new());
        }
        let mut read = tokio::fs::read_dir(dir).await.map_err(|e| storage(dir, e))?;
        let mut paths = Vec::new();
        while let Some(entry) = read.next_entry().await.map_err(|e| storage(dir, e))? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        // Zero-padded seq prefix makes lexical order the write order.
        paths.sort();
        Ok(paths)
    }

    async fn read(&self, path: &Path) -> Result<Checkpoint> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| storage(path, e))?;
        serde_json::from_str(&raw).map_err(|e| {
            SwitchyardError::persistence(format!("corrupt checkpoint {}: {e}", path.display()))
        })
    }
}

fn file_name(checkpoint: &Checkpoint) -> String {
    format!("{:010}-{}.json", checkpoint.seq, checkpoint.checkpoint_id)
}

fn seq_of(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    name.split('-').next()?.parse().ok()
}

async fn remove_thread_dir(dir: &Path) -> Result<bool> {
    if !tokio::fs::try_exists(dir).await.map_err(|e| storage(dir, e))? {
        return Ok(false);
    }
    tokio::fs::remove_dir_all(dir).await.map_err(|e| storage(dir, e))?;
    Ok(true)
}

fn storage(path: &Path, e: std::io::Error) -> SwitchyardError {
    SwitchyardError::persistence(format!("{}: {e}", path.display()))
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn put(&self, step: LoopStep, state: &AgentState) -> Result<Checkpoint> {
        let dir = self.thread_dir(&state.thread_id)?;
        let _guard = self.locks.acquire(&state.thread_id).await;

        let previous_seq = match self.entries(&dir).await?.last() {
            Some(path) => seq_of(path).ok_or_else(|| {
                SwitchyardError::persistence(format!("unexpected checkpoint file {}", path.display()))
            })?,
            None => 0,
        };
        let checkpoint = Checkpoint::next(previous_seq, step, state);

        tokio::fs::create_dir_all(&dir).await.map_err(|e| storage(&dir, e))?;
        let path = dir.join(file_name(&checkpoint));
        let data = serde_json::to_string_pretty(&checkpoint)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data.as_bytes()).await.map_err(|e| storage(&tmp, e))?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| storage(&path, e))?;

        debug!(thread_id = %state.thread_id, seq = checkpoint.seq, %step, "saved checkpoint");
        Ok(checkpoint)
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let dir = self.thread_dir(thread_id)?;
        match self.entries(&dir).await?.last() {
            Some(path) => Ok(Some(self.read(path).await?)),
            None => Ok(None),
        }
    }

    async fn get(&self, thread_id: &str, checkpoint_id: Uuid) -> Result<Option<Checkpoint>> {
        let dir = self.thread_dir(thread_id)?;
        let suffix = format!("-{checkpoint_id}.json");
        let found = self
            .entries(&dir)
            .await?
            .into_iter()
            .find(|p| p.to_string_lossy().ends_with(&suffix));
        match found {
            Some(path) => Ok(Some(self.read(&path).await?)),
            None => Ok(None),
        }
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<Checkpoint>> {
        let dir = self.thread_dir(thread_id)?;
        let mut out = Vec::new();
        for path in self.entries(&dir).await? {
            out.push(self.read(&path).await?);
        }
        Ok(out)
    }

    async fn delete(&self, thread_id: &str) -> Result<bool> {
        let dir = self.thread_dir(thread_id)?;
        let removed = {
            let _guard = self.locks.acquire(thread_id).await;
            remove_thread_dir(&dir).await
        };
        self.locks.forget(thread_id);
        if removed? {
            debug!(thread_id, "deleted thread checkpoints");
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    #[tokio::test]
    async fn snapshots_persist_across_store_instances() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AgentState::new("thread_00000000000000aa");
        state.push(Message::user("hello"));

        let store = FileCheckpointStore::new(dir.path());
        store.put(LoopStep::ValidateInput, &state).await.unwrap();
        state.llm_calls = 1;
        store.put(LoopStep::End, &state).await.unwrap();

        let reopened = FileCheckpointStore::new(dir.path());
        let latest = reopened.latest("thread_00000000000000aa").await.unwrap().unwrap();
        assert_eq!(latest.seq, 2);
        assert_eq!(latest.step, LoopStep::End);
        assert_eq!(latest.state.llm_calls, 1);
        assert_eq!(reopened.list("thread_00000000000000aa").await.unwrap().len(), 2);
    }

    #[test]
    fn seq_is_read_from_the_file_name() {
        let path = Path::new("/tmp/x/0000000012-5d1c6b1e-0000-4000-8000-000000000000.json");
        assert_eq!(seq_of(path), Some(12));
        assert_eq!(seq_of(Path::new("notes.json")), None);
    }

    #[tokio::test]
    async fn path_like_thread_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path());
        let err = store.latest("../escape").await.unwrap_err();
        assert!(matches!(err, SwitchyardError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn missing_thread_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path());
        assert!(store.latest("thread_00000000000000bb").await.unwrap().is_none());
        assert!(store.list("thread_00000000000000bb").await.unwrap().is_empty());
        assert!(!store.delete("thread_00000000000000bb").await.unwrap());
    }

    #[tokio::test]
    async fn delete_releases_the_thread_lock() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path());
        for i in 0..3 {
            let mut state = AgentState::new(format!("thread_{i:016x}"));
            state.push(Message::user("hello"));
            store.put(LoopStep::ValidateInput, &state).await.unwrap();
        }
        assert_eq!(store.locks.len(), 3);

        assert!(store.delete("thread_0000000000000001").await.unwrap());
        assert!(!store.delete("thread_00000000000000ff").await.unwrap());
        assert_eq!(store.locks.len(), 2);
    }
}
