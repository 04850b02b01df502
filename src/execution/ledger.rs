//! Execution ledger state types
//!
//! One [`WorkflowExecution`] is created per run and owned exclusively by
//! the engine until the run finishes, after which it is handed to the
//! checkpoint store for durability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Status of a single step within a run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    /// Terminal statuses admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped
        )
    }
}

/// Overall status of a workflow run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Paused,
    Cancelled,
}

/// Outcome of one tool invocation within a step run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecutionResult {
    /// Tool name as declared in the workflow
    pub tool_name: String,
    /// Whether the gateway reported success
    pub success: bool,
    /// Returned data on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error message on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Served from the per-run result cache without a gateway call
    #[serde(default)]
    pub cached: bool,
    /// Wall-clock duration of the invocation
    pub duration_ms: u64,
}

/// Record of one step's run
///
/// Tool results are kept in invocation order rather than keyed by name so
/// that a step invoking the same tool twice retains both outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub status: StepStatus,
    #[serde(default)]
    pub tool_results: Vec<ToolExecutionResult>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    pub fn new(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepStatus::Pending,
            tool_results: Vec::new(),
            started_at: None,
            completed_at: None,
            duration_ms: None,
            error: None,
        }
    }

    /// A step whose dependencies were unmet; terminal immediately
    pub fn skipped(step_id: impl Into<String>) -> Self {
        let mut result = Self::new(step_id);
        result.status = StepStatus::Skipped;
        result
    }

    /// Transition `pending -> running` and stamp the start time
    pub fn start(&mut self) {
        debug_assert_eq!(self.status, StepStatus::Pending);
        self.status = StepStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Transition `running -> completed` and stamp timing
    pub fn complete(&mut self) {
        debug_assert_eq!(self.status, StepStatus::Running);
        self.status = StepStatus::Completed;
        self.finish();
    }

    /// Transition `running -> failed` with an error message
    pub fn fail(&mut self, error: impl Into<String>) {
        debug_assert!(!self.status.is_terminal());
        self.status = StepStatus::Failed;
        self.error = Some(error.into());
        self.finish();
    }

    fn finish(&mut self) {
        let completed = Utc::now();
        self.completed_at = Some(completed);
        if let Some(started) = self.started_at {
            self.duration_ms = Some(
                completed
                    .signed_duration_since(started)
                    .num_milliseconds()
                    .max(0) as u64,
            );
        }
    }

    /// Most recent result for a tool name, if any
    pub fn tool_result(&self, tool_name: &str) -> Option<&ToolExecutionResult> {
        self.tool_results
            .iter()
            .rev()
            .find(|r| r.tool_name == tool_name)
    }
}

/// The full record of one workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub execution_id: String,
    pub workflow_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub status: ExecutionStatus,
    /// Step the engine is currently on (or halted at)
    pub current_step_id: Option<String>,
    /// Per-step outcomes in processing order
    pub step_results: Vec<StepResult>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Final resolution-context snapshot, used for resume seeding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_state: Option<Value>,
}

impl WorkflowExecution {
    pub fn new(
        workflow_id: impl Into<String>,
        user_id: Option<String>,
        conversation_id: Option<String>,
    ) -> Self {
        Self {
            execution_id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            user_id,
            conversation_id,
            status: ExecutionStatus::Running,
            current_step_id: None,
            step_results: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            error: None,
            workflow_state: None,
        }
    }

    /// The recorded result for a step id, if the step has been processed
    pub fn step_result(&self, step_id: &str) -> Option<&StepResult> {
        self.step_results.iter().find(|r| r.step_id == step_id)
    }

    /// Total run duration so far, in milliseconds
    pub fn duration_ms(&self) -> u64 {
        let end = self.completed_at.unwrap_or_else(Utc::now);
        end.signed_duration_since(self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}
