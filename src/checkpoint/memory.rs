//! In-memory checkpoint store for tests and embedded use

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::Result;
use crate::execution::WorkflowExecution;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    checkpoints: HashMap<String, Vec<Checkpoint>>,
    executions: HashMap<String, WorkflowExecution>,
}

#[derive(Default)]
pub struct InMemoryCheckpointStore {
    inner: Mutex<Inner>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All checkpoints appended for an execution, oldest first
    pub async fn checkpoints(&self, execution_id: &str) -> Vec<Checkpoint> {
        self.inner
            .lock()
            .await
            .checkpoints
            .get(execution_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        self.inner
            .lock()
            .await
            .checkpoints
            .entry(checkpoint.execution_id.clone())
            .or_default()
            .push(checkpoint.clone());
        Ok(())
    }

    async fn save_execution(&self, execution: &WorkflowExecution) -> Result<()> {
        self.inner
            .lock()
            .await
            .executions
            .insert(execution.execution_id.clone(), execution.clone());
        Ok(())
    }

    async fn load_execution(&self, execution_id: &str) -> Result<Option<WorkflowExecution>> {
        Ok(self.inner.lock().await.executions.get(execution_id).cloned())
    }

    async fn latest_checkpoint(&self, execution_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self
            .inner
            .lock()
            .await
            .checkpoints
            .get(execution_id)
            .and_then(|list| list.last().cloned()))
    }

    async fn list_executions(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.inner.lock().await.executions.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
