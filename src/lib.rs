//! # Conductor
//!
//! Declarative multi-step workflow orchestration. Workflows are ordered
//! lists of steps; each step invokes one or more external tools through a
//! [`gateway::ToolGateway`], either concurrently or sequentially, with
//! cross-step parameter substitution, per-run result memoization, and
//! crash-recoverable checkpointing.
//!
//! ## Modules
//!
//! - `workflow` - Immutable workflow definitions and the workflow registry
//! - `engine` - The orchestrator: step loop, dependency gate, step executor,
//!   parameter resolver, and result cache
//! - `execution` - Execution ledger state types and recovery helpers
//! - `gateway` - Tool gateway boundary (trait + HTTP implementation)
//! - `checkpoint` - Checkpoint store boundary (trait, file and memory stores)
//! - `analytics` - Write-only metrics sink
//! - `query` - Best-effort parameter extraction from free-text queries
pub mod analytics;
pub mod checkpoint;
pub mod cli;
pub mod engine;
pub mod error;
pub mod execution;
pub mod gateway;
pub mod query;
pub mod workflow;

pub use error::{Error, Result};
