//! CLI argument parsing and command routing

use crate::analytics::TracingAnalyticsSink;
use crate::checkpoint::FileCheckpointStore;
use crate::engine::{Engine, EngineConfig, ExecuteRequest, RequiredToolPolicy};
use crate::execution::WorkflowExecution;
use crate::gateway::HttpToolGateway;
use crate::workflow::InMemoryWorkflowRegistry;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Run declarative tool workflows against a tool gateway
#[derive(Parser)]
#[command(name = "conductor")]
#[command(about = "Multi-step workflow orchestration with checkpoint/resume", long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct StoreArgs {
    /// Directory holding workflow definition YAML files
    #[arg(long, default_value = "workflows")]
    pub workflows_dir: PathBuf,

    /// Directory for checkpoints and execution ledgers
    #[arg(long, default_value = ".conductor/executions")]
    pub state_dir: PathBuf,
}

#[derive(Args)]
pub struct GatewayArgs {
    /// Base URL of the tool gateway
    #[arg(long, env = "CONDUCTOR_GATEWAY_URL")]
    pub gateway_url: String,

    /// Treat a required tool's failure as a step failure that halts the run
    #[arg(long)]
    pub escalate_required: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a workflow by id (or from a YAML file path)
    Run {
        /// Workflow id, or a path to a workflow YAML file
        workflow: String,

        /// Free-text user query driving parameter extraction
        #[arg(short, long)]
        query: String,

        /// Explicit parameter as key=value (value parsed as JSON when possible)
        #[arg(short, long)]
        param: Vec<String>,

        #[command(flatten)]
        store: StoreArgs,

        #[command(flatten)]
        gateway: GatewayArgs,
    },
    /// List registered workflow definitions
    List {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// List persisted execution ledgers
    Executions {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Resume a failed or paused execution from its last checkpoint
    Resume {
        /// Execution id of the prior run
        execution_id: String,

        #[command(flatten)]
        store: StoreArgs,

        #[command(flatten)]
        gateway: GatewayArgs,
    },
}

pub async fn execute_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            workflow,
            query,
            param,
            store,
            gateway,
        } => run(workflow, query, param, store, gateway).await,
        Commands::List { store } => list(store),
        Commands::Executions { store } => executions(store).await,
        Commands::Resume {
            execution_id,
            store,
            gateway,
        } => resume(execution_id, store, gateway).await,
    }
}

fn build_engine(store: &StoreArgs, gateway: &GatewayArgs) -> Engine {
    let policy = if gateway.escalate_required {
        RequiredToolPolicy::Escalate
    } else {
        RequiredToolPolicy::Degrade
    };
    Engine::with_config(
        Arc::new(HttpToolGateway::new(&gateway.gateway_url)),
        Arc::new(FileCheckpointStore::new(&store.state_dir)),
        Arc::new(TracingAnalyticsSink),
        EngineConfig {
            required_tool_policy: policy,
            checkpoints_disabled: false,
        },
    )
}

fn load_registry(store: &StoreArgs) -> Result<InMemoryWorkflowRegistry> {
    let mut registry = InMemoryWorkflowRegistry::new();
    if store.workflows_dir.is_dir() {
        registry
            .load_dir(&store.workflows_dir)
            .with_context(|| format!("failed to load workflows from {:?}", store.workflows_dir))?;
    }
    Ok(registry)
}

/// Parse `key=value` pairs, taking values as JSON when they parse as such
fn parse_params(pairs: &[String]) -> Result<serde_json::Map<String, Value>> {
    let mut params = serde_json::Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("invalid --param '{pair}', expected key=value"))?;
        let parsed = serde_json::from_str(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        params.insert(key.to_string(), parsed);
    }
    Ok(params)
}

async fn run(
    workflow: String,
    query: String,
    param: Vec<String>,
    store: StoreArgs,
    gateway: GatewayArgs,
) -> Result<()> {
    let mut registry = load_registry(&store)?;

    // A path argument is loaded ad hoc and run by its declared id
    let workflow_id = if workflow.ends_with(".yml") || workflow.ends_with(".yaml") {
        registry
            .load_file(std::path::Path::new(&workflow))
            .with_context(|| format!("failed to load workflow file '{workflow}'"))?
    } else {
        workflow
    };

    let params = parse_params(&param)?;
    let engine = build_engine(&store, &gateway);
    let request = ExecuteRequest {
        workflow_id,
        user_query: query,
        user_id: None,
        conversation_id: None,
        parameters: if params.is_empty() { None } else { Some(params) },
    };

    let execution = engine.execute_workflow(&registry, request).await?;
    print_summary(&execution);
    Ok(())
}

fn list(store: StoreArgs) -> Result<()> {
    let registry = load_registry(&store)?;
    for id in crate::workflow::WorkflowLookup::list(&registry) {
        println!("{id}");
    }
    Ok(())
}

async fn executions(store: StoreArgs) -> Result<()> {
    let checkpoint_store = FileCheckpointStore::new(&store.state_dir);
    use crate::checkpoint::CheckpointStore;
    for id in checkpoint_store.list_executions().await? {
        if let Some(execution) = checkpoint_store.load_execution(&id).await? {
            println!(
                "{}  {:?}  workflow={}  steps={}",
                id,
                execution.status,
                execution.workflow_id,
                execution.step_results.len()
            );
        }
    }
    Ok(())
}

async fn resume(execution_id: String, store: StoreArgs, gateway: GatewayArgs) -> Result<()> {
    let registry = load_registry(&store)?;
    let engine = build_engine(&store, &gateway);
    let execution = engine.resume_workflow(&registry, &execution_id).await?;
    print_summary(&execution);
    Ok(())
}

fn print_summary(execution: &WorkflowExecution) {
    println!(
        "execution {} ({}): {:?} in {}ms",
        execution.execution_id,
        execution.workflow_id,
        execution.status,
        execution.duration_ms()
    );
    for step in &execution.step_results {
        let tools: Vec<String> = step
            .tool_results
            .iter()
            .map(|t| {
                format!(
                    "{}{}{}",
                    t.tool_name,
                    if t.cached { " (cached)" } else { "" },
                    if t.success { "" } else { " [failed]" }
                )
            })
            .collect();
        println!("  {:<20} {:?}  {}", step.step_id, step.status, tools.join(", "));
    }
    if let Some(error) = &execution.error {
        println!("error: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_parse_json_values_and_fall_back_to_strings() {
        let params =
            parse_params(&["count=3".into(), "topic=rust async".into(), "deep=true".into()])
                .unwrap();
        assert_eq!(params["count"], Value::from(3));
        assert_eq!(params["topic"], Value::from("rust async"));
        assert_eq!(params["deep"], Value::from(true));
    }

    #[test]
    fn malformed_param_is_rejected() {
        assert!(parse_params(&["no-equals".into()]).is_err());
    }
}
