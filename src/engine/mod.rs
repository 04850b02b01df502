//! Workflow orchestration engine
//!
//! The engine walks a workflow's steps in author-declared order; it is
//! deliberately a linear gate-and-skip loop, not a DAG scheduler. Steps
//! never overlap in time, which keeps the dependency gate and cross-step
//! context propagation race-free; concurrency exists only inside a
//! parallel step's fan-out.
//!
//! Collaborators are injected at construction: a [`ToolGateway`] for tool
//! dispatch, a [`CheckpointStore`] for durability, and an
//! [`AnalyticsSink`] for metrics. There is no process-wide state.

use crate::analytics::AnalyticsSink;
use crate::checkpoint::{Checkpoint, CheckpointStore, CheckpointType};
use crate::engine::gate::dependencies_ready;
use crate::error::{Error, Result};
use crate::execution::{
    context_from_checkpoint, resume_point, ExecutionStatus, StepResult, StepStatus,
    ToolExecutionResult, WorkflowExecution,
};
use crate::gateway::ToolGateway;
use crate::query::extract_parameters;
use crate::workflow::{require_workflow, Workflow, WorkflowLookup};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

pub mod cache;
pub mod context;
pub mod gate;
pub mod resolver;
pub mod step;

pub use cache::{cache_key, ResultCache};
pub use context::ResolutionContext;
pub use resolver::resolve_params;
pub use step::StepExecutor;

/// What a required tool's failure does to its step.
///
/// `Degrade` matches the historical behavior: the failure is logged at
/// error severity but the step still completes with partial results.
/// `Escalate` turns it into a step failure that halts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequiredToolPolicy {
    #[default]
    Degrade,
    Escalate,
}

/// Engine tuning knobs
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub required_tool_policy: RequiredToolPolicy,
    /// Disable to skip checkpoint writes entirely (ledger is still saved)
    pub checkpoints_disabled: bool,
}

/// Caller-supplied inputs for one run
#[derive(Debug, Clone, Default)]
pub struct ExecuteRequest {
    pub workflow_id: String,
    pub user_query: String,
    pub user_id: Option<String>,
    pub conversation_id: Option<String>,
    /// Explicit parameters; when absent they are extracted best-effort
    /// from `user_query`
    pub parameters: Option<Map<String, Value>>,
}

pub struct Engine {
    gateway: Arc<dyn ToolGateway>,
    checkpoints: Arc<dyn CheckpointStore>,
    analytics: Arc<dyn AnalyticsSink>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(
        gateway: Arc<dyn ToolGateway>,
        checkpoints: Arc<dyn CheckpointStore>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self::with_config(gateway, checkpoints, analytics, EngineConfig::default())
    }

    pub fn with_config(
        gateway: Arc<dyn ToolGateway>,
        checkpoints: Arc<dyn CheckpointStore>,
        analytics: Arc<dyn AnalyticsSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            gateway,
            checkpoints,
            analytics,
            config,
        }
    }

    /// Look up the workflow and execute it for the given request
    pub async fn execute_workflow(
        &self,
        lookup: &dyn WorkflowLookup,
        request: ExecuteRequest,
    ) -> Result<WorkflowExecution> {
        let workflow = require_workflow(lookup, &request.workflow_id)?;
        self.execute(&workflow, request).await
    }

    /// Execute a workflow definition directly
    pub async fn execute(
        &self,
        workflow: &Workflow,
        request: ExecuteRequest,
    ) -> Result<WorkflowExecution> {
        let parameters = request
            .parameters
            .unwrap_or_else(|| extract_parameters(&request.user_query));
        let context = ResolutionContext::new(&request.user_query, parameters);
        let execution =
            WorkflowExecution::new(&workflow.id, request.user_id, request.conversation_id);
        info!(
            workflow_id = %workflow.id,
            execution_id = %execution.execution_id,
            steps = workflow.steps.len(),
            "starting workflow execution"
        );
        Ok(self.run(workflow, execution, context, 0).await)
    }

    /// Reconstruct a run from a failed or paused execution's last
    /// checkpoint, starting after its last completed step.
    ///
    /// The resumed run gets a fresh execution id; the prior ledger is
    /// left untouched.
    pub async fn resume_workflow(
        &self,
        lookup: &dyn WorkflowLookup,
        execution_id: &str,
    ) -> Result<WorkflowExecution> {
        let prior = self
            .checkpoints
            .load_execution(execution_id)
            .await?
            .ok_or_else(|| Error::ExecutionNotFound(execution_id.to_string()))?;

        if !matches!(
            prior.status,
            ExecutionStatus::Failed | ExecutionStatus::Paused
        ) {
            return Err(Error::NotResumable {
                execution_id: execution_id.to_string(),
                reason: format!("status is {:?}", prior.status),
            });
        }
        let point = resume_point(&prior).ok_or_else(|| Error::NotResumable {
            execution_id: execution_id.to_string(),
            reason: "no completed step to resume from".to_string(),
        })?;

        let workflow = require_workflow(lookup, &prior.workflow_id)?;
        let start_index = workflow
            .steps
            .iter()
            .position(|s| s.id == point.last_completed_step_id)
            .map(|i| i + 1)
            .ok_or_else(|| Error::NotResumable {
                execution_id: execution_id.to_string(),
                reason: format!(
                    "workflow '{}' no longer contains step '{}'",
                    workflow.id, point.last_completed_step_id
                ),
            })?;

        let blob = self
            .checkpoints
            .latest_checkpoint(execution_id)
            .await?
            .and_then(|c| context_from_checkpoint(&c.data))
            .or(prior.workflow_state);
        let context = blob
            .map(ResolutionContext::from_snapshot)
            .unwrap_or_default();

        let mut execution =
            WorkflowExecution::new(&prior.workflow_id, prior.user_id, prior.conversation_id);
        execution.step_results = point.carried_results;
        info!(
            prior_execution_id = %execution_id,
            execution_id = %execution.execution_id,
            resume_after = %point.last_completed_step_id,
            "resuming workflow execution"
        );
        Ok(self.run(&workflow, execution, context, start_index).await)
    }

    /// The step loop. Infallible by design: every failure mode lands in
    /// the returned ledger rather than an `Err`.
    async fn run(
        &self,
        workflow: &Workflow,
        mut execution: WorkflowExecution,
        mut context: ResolutionContext,
        start_index: usize,
    ) -> WorkflowExecution {
        let executor =
            StepExecutor::with_policy(self.gateway.clone(), self.config.required_tool_policy);
        let mut cache = ResultCache::new();
        let mut halted = false;

        for step in workflow.steps.iter().skip(start_index) {
            execution.current_step_id = Some(step.id.clone());

            if !dependencies_ready(step, &execution) {
                info!(step_id = %step.id, "dependencies unmet, skipping step");
                execution.step_results.push(StepResult::skipped(&step.id));
                continue;
            }

            self.save_checkpoint(&execution, &step.id, CheckpointType::StepStart, &context, None)
                .await;

            match executor.run(step, &context, &mut cache).await {
                Ok(step_result) => {
                    self.record_tools(&step_result);
                    let failed = step_result.status == StepStatus::Failed;
                    let error = step_result.error.clone();
                    if !failed {
                        for outcome in &step_result.tool_results {
                            if outcome.success {
                                if let Some(data) = &outcome.data {
                                    context.absorb_tool_output(&outcome.tool_name, data);
                                }
                            }
                        }
                    }
                    execution.step_results.push(step_result);
                    if failed {
                        self.save_checkpoint(
                            &execution,
                            &step.id,
                            CheckpointType::ErrorRecovery,
                            &context,
                            error.as_deref(),
                        )
                        .await;
                        execution.status = ExecutionStatus::Failed;
                        execution.error = error;
                        halted = true;
                        break;
                    }
                    self.save_checkpoint(
                        &execution,
                        &step.id,
                        CheckpointType::StepComplete,
                        &context,
                        None,
                    )
                    .await;
                }
                Err(e) => {
                    // Orchestration-level failure: no further steps run
                    let message = e.to_string();
                    warn!(step_id = %step.id, error = %message, "step orchestration failed, halting");
                    let mut step_result = StepResult::new(&step.id);
                    step_result.start();
                    step_result.fail(&message);
                    execution.step_results.push(step_result);
                    self.save_checkpoint(
                        &execution,
                        &step.id,
                        CheckpointType::ErrorRecovery,
                        &context,
                        Some(&message),
                    )
                    .await;
                    execution.status = ExecutionStatus::Failed;
                    execution.error = Some(message);
                    halted = true;
                    break;
                }
            }
        }

        if !halted {
            execution.status = ExecutionStatus::Completed;
        }
        execution.completed_at = Some(Utc::now());
        execution.workflow_state = Some(context.snapshot());

        let tool_results: Vec<&ToolExecutionResult> = execution
            .step_results
            .iter()
            .flat_map(|s| &s.tool_results)
            .collect();
        self.analytics.record_workflow(
            &execution.workflow_id,
            execution.duration_ms(),
            execution.status == ExecutionStatus::Completed,
            &tool_results,
        );

        if let Err(e) = self.checkpoints.save_execution(&execution).await {
            warn!(execution_id = %execution.execution_id, error = %e, "failed to persist ledger");
        }
        info!(
            execution_id = %execution.execution_id,
            status = ?execution.status,
            duration_ms = execution.duration_ms(),
            "workflow execution finished"
        );
        execution
    }

    /// Best-effort checkpoint write; durability problems are logged and
    /// swallowed so they can never corrupt or abort the run
    async fn save_checkpoint(
        &self,
        execution: &WorkflowExecution,
        step_id: &str,
        kind: CheckpointType,
        context: &ResolutionContext,
        error: Option<&str>,
    ) {
        if self.config.checkpoints_disabled {
            return;
        }
        let mut data = json!({
            "context": context.snapshot(),
            "step_results": execution.step_results,
        });
        if let Some(message) = error {
            data["error"] = Value::String(message.to_string());
        }
        let checkpoint = Checkpoint::new(&execution.execution_id, step_id, kind, data);
        if let Err(e) = self.checkpoints.save_checkpoint(&checkpoint).await {
            warn!(
                execution_id = %execution.execution_id,
                step_id,
                error = %e,
                "checkpoint save failed"
            );
        }
    }

    fn record_tools(&self, step_result: &StepResult) {
        for outcome in &step_result.tool_results {
            self.analytics.record_tool(
                &outcome.tool_name,
                outcome.duration_ms,
                outcome.success,
                outcome.cached,
            );
        }
    }
}
