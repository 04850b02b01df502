//! Execution ledger and recovery

pub mod ledger;
pub mod recovery;

pub use ledger::{
    ExecutionStatus, StepResult, StepStatus, ToolExecutionResult, WorkflowExecution,
};
pub use recovery::{context_from_checkpoint, resume_point, ResumePoint};
