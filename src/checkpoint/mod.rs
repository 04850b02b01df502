//! Checkpoint and execution persistence boundary
//!
//! Checkpoints are append-only, keyed by `(execution_id, step_id)`; the
//! ledger snapshot is keyed by execution id. The store performs no retry
//! or recovery logic itself. Engine-side save failures are logged and
//! swallowed so durability problems can never abort a run.

use crate::error::Result;
use crate::execution::WorkflowExecution;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod file;
pub mod memory;

pub use file::FileCheckpointStore;
pub use memory::InMemoryCheckpointStore;

/// Why a checkpoint was taken
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointType {
    StepStart,
    StepComplete,
    ErrorRecovery,
    Manual,
}

impl CheckpointType {
    /// Stable name used in checkpoint file names
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointType::StepStart => "step_start",
            CheckpointType::StepComplete => "step_complete",
            CheckpointType::ErrorRecovery => "error_recovery",
            CheckpointType::Manual => "manual",
        }
    }
}

/// A durable snapshot of execution progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub execution_id: String,
    pub step_id: String,
    pub checkpoint_type: CheckpointType,
    /// Opaque serialized context (accumulated results + resolution context)
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(
        execution_id: impl Into<String>,
        step_id: impl Into<String>,
        checkpoint_type: CheckpointType,
        data: Value,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            step_id: step_id.into(),
            checkpoint_type,
            data,
            created_at: Utc::now(),
        }
    }
}

/// Append-only persistence for checkpoints and ledger snapshots.
///
/// Implementations must tolerate concurrent appends from independent
/// executions; executions never share an id, and checkpoints are never
/// updated in place.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Append a checkpoint for an execution
    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Persist the current ledger snapshot, replacing any prior snapshot
    async fn save_execution(&self, execution: &WorkflowExecution) -> Result<()>;

    /// Load the most recent ledger snapshot for an execution
    async fn load_execution(&self, execution_id: &str) -> Result<Option<WorkflowExecution>>;

    /// Most recent checkpoint for an execution; most recent wins on resume
    async fn latest_checkpoint(&self, execution_id: &str) -> Result<Option<Checkpoint>>;

    /// Ids of all executions with a persisted ledger snapshot
    async fn list_executions(&self) -> Result<Vec<String>>;
}
