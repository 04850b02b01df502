//! Recovery helpers for resuming interrupted runs
//!
//! Recovery is a pure inspection of a persisted ledger: find the last
//! completed step, and seed a fresh run with the checkpointed context.
//! No retry logic lives here.

use crate::execution::ledger::{StepResult, StepStatus, WorkflowExecution};
use serde_json::Value;

/// Where a resumed run should pick up
#[derive(Debug, Clone)]
pub struct ResumePoint {
    /// Index into `step_results` of the last completed step
    pub last_completed_index: usize,
    /// Id of the last completed step
    pub last_completed_step_id: String,
    /// Step results to carry into the new ledger unchanged
    pub carried_results: Vec<StepResult>,
}

/// Locate the last completed step of a prior run.
///
/// Returns `None` when no step completed, in which case the run is not
/// resumable and must be started from scratch.
pub fn resume_point(execution: &WorkflowExecution) -> Option<ResumePoint> {
    let (index, result) = execution
        .step_results
        .iter()
        .enumerate()
        .rev()
        .find(|(_, r)| r.status == StepStatus::Completed)?;

    Some(ResumePoint {
        last_completed_index: index,
        last_completed_step_id: result.step_id.clone(),
        carried_results: execution.step_results[..=index].to_vec(),
    })
}

/// Extract the resolution-context blob from checkpoint data.
///
/// Checkpoint `data` wraps the context snapshot under a `context` key;
/// older ledger snapshots store it directly in `workflow_state`.
pub fn context_from_checkpoint(data: &Value) -> Option<Value> {
    data.get("context").cloned().or_else(|| {
        if data.is_object() {
            Some(data.clone())
        } else {
            None
        }
    })
}
