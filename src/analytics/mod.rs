//! Write-only analytics sink
//!
//! The engine emits per-tool and per-workflow counters here. Sinks are
//! fire-and-forget: they must never block or fail the run, so the trait is
//! synchronous and infallible.

use crate::execution::ToolExecutionResult;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Observability sink for tool and workflow metrics
pub trait AnalyticsSink: Send + Sync {
    /// Record one tool invocation
    fn record_tool(&self, name: &str, duration_ms: u64, success: bool, cached: bool);

    /// Record one finished workflow run
    fn record_workflow(
        &self,
        workflow_id: &str,
        duration_ms: u64,
        success: bool,
        tool_results: &[&ToolExecutionResult],
    );
}

/// Sink that logs metrics through `tracing` and keeps nothing
#[derive(Default)]
pub struct TracingAnalyticsSink;

impl AnalyticsSink for TracingAnalyticsSink {
    fn record_tool(&self, name: &str, duration_ms: u64, success: bool, cached: bool) {
        debug!(tool = name, duration_ms, success, cached, "tool invocation");
    }

    fn record_workflow(
        &self,
        workflow_id: &str,
        duration_ms: u64,
        success: bool,
        tool_results: &[&ToolExecutionResult],
    ) {
        debug!(
            workflow_id,
            duration_ms,
            success,
            tool_count = tool_results.len(),
            "workflow run"
        );
    }
}

/// Aggregated counters for one tool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolStats {
    pub calls: u64,
    pub successes: u64,
    pub cache_hits: u64,
    pub total_duration_ms: u64,
}

/// Aggregated counters for one workflow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowStats {
    pub runs: u64,
    pub successes: u64,
    pub total_duration_ms: u64,
}

#[derive(Default)]
struct Counters {
    tools: HashMap<String, ToolStats>,
    workflows: HashMap<String, WorkflowStats>,
}

/// In-memory aggregating sink, queryable by tests and the CLI summary
#[derive(Default)]
pub struct InMemoryAnalyticsSink {
    counters: Mutex<Counters>,
}

impl InMemoryAnalyticsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool_stats(&self, name: &str) -> Option<ToolStats> {
        self.lock().tools.get(name).cloned()
    }

    pub fn workflow_stats(&self, workflow_id: &str) -> Option<WorkflowStats> {
        self.lock().workflows.get(workflow_id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Counters> {
        // A poisoned sink only means a panic elsewhere; counters stay usable
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl AnalyticsSink for InMemoryAnalyticsSink {
    fn record_tool(&self, name: &str, duration_ms: u64, success: bool, cached: bool) {
        let mut counters = self.lock();
        let stats = counters.tools.entry(name.to_string()).or_default();
        stats.calls += 1;
        stats.total_duration_ms += duration_ms;
        if success {
            stats.successes += 1;
        }
        if cached {
            stats.cache_hits += 1;
        }
    }

    fn record_workflow(
        &self,
        workflow_id: &str,
        duration_ms: u64,
        success: bool,
        _tool_results: &[&ToolExecutionResult],
    ) {
        let mut counters = self.lock();
        let stats = counters
            .workflows
            .entry(workflow_id.to_string())
            .or_default();
        stats.runs += 1;
        stats.total_duration_ms += duration_ms;
        if success {
            stats.successes += 1;
        }
    }
}
