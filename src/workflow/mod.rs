//! Workflow definitions and lookup

pub mod definition;
pub mod registry;

pub use definition::{ParamTemplate, Workflow, WorkflowStep, WorkflowTool};
pub use registry::{require_workflow, InMemoryWorkflowRegistry, WorkflowLookup};
