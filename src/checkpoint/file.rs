//! JSON-file checkpoint store
//!
//! Layout under the base directory:
//!
//! ```text
//! <base>/<execution_id>/ledger.json
//! <base>/<execution_id>/checkpoints/<seq>-<type>.json
//! ```
//!
//! All writes go through a temp file and an atomic rename so a crash never
//! leaves a half-written snapshot behind.

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::{Error, Result};
use crate::execution::WorkflowExecution;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

pub struct FileCheckpointStore {
    base_dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn execution_dir(&self, execution_id: &str) -> PathBuf {
        self.base_dir.join(execution_id)
    }

    fn ledger_path(&self, execution_id: &str) -> PathBuf {
        self.execution_dir(execution_id).join("ledger.json")
    }

    fn checkpoints_dir(&self, execution_id: &str) -> PathBuf {
        self.execution_dir(execution_id).join("checkpoints")
    }

    async fn write_atomic(path: &Path, json: String) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, json).await?;
        fs::rename(&temp_path, path).await?;
        Ok(())
    }

    /// Checkpoint files sorted by their numeric sequence prefix
    async fn checkpoint_files(&self, execution_id: &str) -> Result<Vec<(u64, PathBuf)>> {
        let dir = self.checkpoints_dir(execution_id);
        let mut files = Vec::new();
        if !dir.exists() {
            return Ok(files);
        }
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(seq) = name.split('-').next().and_then(|s| s.parse::<u64>().ok()) {
                files.push((seq, path));
            }
        }
        files.sort_by_key(|(seq, _)| *seq);
        Ok(files)
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        let seq = self
            .checkpoint_files(&checkpoint.execution_id)
            .await?
            .last()
            .map(|(seq, _)| seq + 1)
            .unwrap_or(0);
        let path = self.checkpoints_dir(&checkpoint.execution_id).join(format!(
            "{:06}-{}.json",
            seq,
            checkpoint.checkpoint_type.as_str()
        ));
        let json = serde_json::to_string_pretty(checkpoint)?;
        Self::write_atomic(&path, json).await?;
        debug!(
            execution_id = %checkpoint.execution_id,
            step_id = %checkpoint.step_id,
            checkpoint_type = checkpoint.checkpoint_type.as_str(),
            seq,
            "saved checkpoint"
        );
        Ok(())
    }

    async fn save_execution(&self, execution: &WorkflowExecution) -> Result<()> {
        let json = serde_json::to_string_pretty(execution)?;
        Self::write_atomic(&self.ledger_path(&execution.execution_id), json).await?;
        debug!(execution_id = %execution.execution_id, "saved ledger snapshot");
        Ok(())
    }

    async fn load_execution(&self, execution_id: &str) -> Result<Option<WorkflowExecution>> {
        let path = self.ledger_path(execution_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).await?;
        let execution = serde_json::from_str(&content)
            .map_err(|e| Error::Persistence(format!("corrupt ledger snapshot at {path:?}: {e}")))?;
        Ok(Some(execution))
    }

    async fn latest_checkpoint(&self, execution_id: &str) -> Result<Option<Checkpoint>> {
        let Some((_, path)) = self.checkpoint_files(execution_id).await?.pop() else {
            return Ok(None);
        };
        let content = fs::read_to_string(&path).await?;
        let checkpoint = serde_json::from_str(&content)
            .map_err(|e| Error::Persistence(format!("corrupt checkpoint at {path:?}: {e}")))?;
        Ok(Some(checkpoint))
    }

    async fn list_executions(&self) -> Result<Vec<String>> {
        let mut executions = Vec::new();
        if !self.base_dir.exists() {
            return Ok(executions);
        }
        let mut entries = fs::read_dir(&self.base_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().join("ledger.json").exists() {
                if let Some(id) = entry.file_name().to_str() {
                    executions.push(id.to_string());
                }
            }
        }
        executions.sort();
        Ok(executions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointType;
    use serde_json::json;

    #[tokio::test]
    async fn checkpoints_append_in_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path());

        for (step, kind) in [
            ("a", CheckpointType::StepStart),
            ("a", CheckpointType::StepComplete),
            ("b", CheckpointType::StepStart),
        ] {
            store
                .save_checkpoint(&Checkpoint::new("exec-1", step, kind, json!({"step": step})))
                .await
                .unwrap();
        }

        let latest = store.latest_checkpoint("exec-1").await.unwrap().unwrap();
        assert_eq!(latest.step_id, "b");
        assert_eq!(latest.checkpoint_type, CheckpointType::StepStart);
    }

    #[tokio::test]
    async fn ledger_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path());
        let execution = WorkflowExecution::new("wf", None, None);

        store.save_execution(&execution).await.unwrap();
        let loaded = store
            .load_execution(&execution.execution_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.workflow_id, "wf");
        assert_eq!(
            store.list_executions().await.unwrap(),
            vec![execution.execution_id.clone()]
        );
    }

    #[tokio::test]
    async fn missing_execution_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path());
        assert!(store.load_execution("nope").await.unwrap().is_none());
        assert!(store.latest_checkpoint("nope").await.unwrap().is_none());
        assert!(store.list_executions().await.unwrap().is_empty());
    }
}
