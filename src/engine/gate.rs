//! Dependency gate
//!
//! A pure check with no side effects: a step is ready iff every declared
//! dependency has a `completed` result in the ledger. An unready step is
//! recorded as `skipped` by the engine and never deferred or reordered;
//! execution stays in author-declared order.

use crate::execution::{StepStatus, WorkflowExecution};
use crate::workflow::WorkflowStep;

/// True iff every dependency of `step` completed in this run
pub fn dependencies_ready(step: &WorkflowStep, execution: &WorkflowExecution) -> bool {
    step.depends_on.iter().all(|dep_id| {
        execution
            .step_result(dep_id)
            .is_some_and(|r| r.status == StepStatus::Completed)
    })
}
