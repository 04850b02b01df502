//! Step executor
//!
//! Runs one step's tools through cache and gateway. Parallel steps resolve
//! every tool against the same context snapshot and fan out together;
//! sequential steps thread each tool's output into the next tool's
//! resolution context. A tool failure, whether reported by the backend or
//! raised by the invocation layer, is captured in that tool's result and
//! never aborts its siblings. Only malformed steps error out of here.

use crate::engine::cache::{cache_key, ResultCache};
use crate::engine::context::ResolutionContext;
use crate::engine::resolver::resolve_params;
use crate::engine::RequiredToolPolicy;
use crate::error::{Error, Result};
use crate::execution::{StepResult, ToolExecutionResult};
use crate::gateway::{ToolGateway, ToolParams, ToolResponse};
use crate::workflow::WorkflowStep;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub struct StepExecutor {
    gateway: Arc<dyn ToolGateway>,
    policy: RequiredToolPolicy,
}

impl StepExecutor {
    pub fn new(gateway: Arc<dyn ToolGateway>) -> Self {
        Self::with_policy(gateway, RequiredToolPolicy::Degrade)
    }

    pub fn with_policy(gateway: Arc<dyn ToolGateway>, policy: RequiredToolPolicy) -> Self {
        Self { gateway, policy }
    }

    /// Run a step to completion, capturing one result per tool invocation
    /// in declaration order.
    pub async fn run(
        &self,
        step: &WorkflowStep,
        context: &ResolutionContext,
        cache: &mut ResultCache,
    ) -> Result<StepResult> {
        if step.tools.is_empty() {
            return Err(Error::MalformedStep {
                step_id: step.id.clone(),
                reason: "step declares no tools".to_string(),
            });
        }

        let mut result = StepResult::new(&step.id);
        result.start();
        info!(
            step_id = %step.id,
            parallel = step.parallel,
            tools = step.tools.len(),
            "executing step"
        );

        let outcomes = if step.parallel {
            self.run_parallel(step, context, cache).await?
        } else {
            self.run_sequential(step, context, cache).await?
        };

        let mut failed_required = None;
        for (tool, outcome) in step.tools.iter().zip(&outcomes) {
            if !outcome.success {
                let err = outcome.error.as_deref().unwrap_or("unknown error");
                if tool.required {
                    error!(step_id = %step.id, tool = %tool.name, error = err, "required tool failed");
                    failed_required.get_or_insert_with(|| tool.name.clone());
                } else {
                    warn!(step_id = %step.id, tool = %tool.name, error = err, "optional tool failed");
                }
            }
        }

        result.tool_results = outcomes;
        match failed_required {
            Some(tool) if self.policy == RequiredToolPolicy::Escalate => {
                result.fail(format!("required tool '{tool}' failed"));
            }
            // Degrade policy: required failures are loud but the step
            // still completes with partial results
            _ => result.complete(),
        }
        Ok(result)
    }

    /// Fan out every tool against one context snapshot and join all
    /// outcomes. Siblings never see each other's output; duplicate
    /// (tool, params) pairs within the fan-out are invoked once.
    async fn run_parallel(
        &self,
        step: &WorkflowStep,
        context: &ResolutionContext,
        cache: &mut ResultCache,
    ) -> Result<Vec<ToolExecutionResult>> {
        let mut resolved = Vec::with_capacity(step.tools.len());
        for tool in &step.tools {
            let params = resolve_params(&tool.params, context);
            let key = cache_key(&tool.name, &params)?;
            resolved.push((tool.name.clone(), key, params));
        }

        let mut outcomes: Vec<Option<ToolExecutionResult>> = vec![None; resolved.len()];
        // key -> index of the invocation that owns the gateway call
        let mut owners: HashMap<&str, usize> = HashMap::new();
        let mut duplicates: Vec<(usize, usize)> = Vec::new();
        let mut launches: Vec<usize> = Vec::new();

        for (index, (_, key, _)) in resolved.iter().enumerate() {
            if let Some(hit) = cache.get(key) {
                outcomes[index] = Some(from_cache(&resolved[index].0, hit));
            } else if let Some(&owner) = owners.get(key.as_str()) {
                duplicates.push((index, owner));
            } else {
                owners.insert(key.as_str(), index);
                launches.push(index);
            }
        }

        let responses = join_all(launches.iter().map(|&index| {
            let (name, _, params) = &resolved[index];
            self.invoke(name, params)
        }))
        .await;

        let mut by_owner: HashMap<usize, ToolResponse> = HashMap::new();
        for (&index, response) in launches.iter().zip(responses) {
            let (name, key, _) = &resolved[index];
            cache.set(key.clone(), response.clone());
            outcomes[index] = Some(from_response(name, &response, false));
            by_owner.insert(index, response);
        }

        for (index, owner) in duplicates {
            if let Some(response) = by_owner.get(&owner) {
                let name = &resolved[index].0;
                outcomes[index] = Some(ToolExecutionResult {
                    cached: response.success,
                    duration_ms: 0,
                    ..from_response(name, response, false)
                });
            }
        }

        Ok(outcomes.into_iter().flatten().collect())
    }

    /// Run tools left to right, folding each success into a step-local
    /// context so tool N can reference tool N-1 by name.
    async fn run_sequential(
        &self,
        step: &WorkflowStep,
        context: &ResolutionContext,
        cache: &mut ResultCache,
    ) -> Result<Vec<ToolExecutionResult>> {
        let mut local = context.clone();
        let mut outcomes = Vec::with_capacity(step.tools.len());

        for tool in &step.tools {
            let params = resolve_params(&tool.params, &local);
            let key = cache_key(&tool.name, &params)?;

            let outcome = if let Some(hit) = cache.get(&key) {
                from_cache(&tool.name, hit)
            } else {
                let response = self.invoke(&tool.name, &params).await;
                let outcome = from_response(&tool.name, &response, false);
                cache.set(key, response);
                outcome
            };

            if outcome.success {
                if let Some(data) = &outcome.data {
                    local.absorb_tool_output(&tool.name, data);
                }
            }
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Invoke through the gateway, converting invocation-layer errors
    /// (transport, timeout) into failed responses so they are captured
    /// per-tool like any business failure.
    async fn invoke(&self, name: &str, params: &ToolParams) -> ToolResponse {
        let started = Instant::now();
        match self.gateway.execute(name, params).await {
            Ok(response) => response,
            Err(e) => ToolResponse::err(
                format!("tool invocation failed: {e}"),
                started.elapsed().as_millis() as u64,
            ),
        }
    }
}

fn from_response(tool_name: &str, response: &ToolResponse, cached: bool) -> ToolExecutionResult {
    ToolExecutionResult {
        tool_name: tool_name.to_string(),
        success: response.success,
        data: response.data.clone(),
        error: response.error.clone(),
        cached,
        duration_ms: response.duration_ms,
    }
}

fn from_cache(tool_name: &str, response: &ToolResponse) -> ToolExecutionResult {
    ToolExecutionResult {
        duration_ms: 0,
        ..from_response(tool_name, response, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::StepStatus;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Gateway stub: maps tool name to a canned response, records calls
    struct StubGateway {
        responses: HashMap<String, ToolResponse>,
        errors: Vec<String>,
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl StubGateway {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                errors: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn respond(mut self, tool: &str, data: Value) -> Self {
            self.responses
                .insert(tool.to_string(), ToolResponse::ok(data, 7));
            self
        }

        fn fail(mut self, tool: &str, error: &str) -> Self {
            self.responses
                .insert(tool.to_string(), ToolResponse::err(error, 7));
            self
        }

        fn raise(mut self, tool: &str) -> Self {
            self.errors.push(tool.to_string());
            self
        }

        fn calls(&self) -> Vec<(String, Value)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolGateway for StubGateway {
        async fn execute(&self, name: &str, params: &ToolParams) -> Result<ToolResponse> {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), Value::Object(params.clone())));
            if self.errors.iter().any(|t| t == name) {
                return Err(Error::Gateway(format!("connection refused for {name}")));
            }
            Ok(self
                .responses
                .get(name)
                .cloned()
                .unwrap_or_else(|| ToolResponse::err(format!("unknown tool {name}"), 0)))
        }
    }

    fn step_yaml(yaml: &str) -> WorkflowStep {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn context() -> ResolutionContext {
        ResolutionContext::new("test query", serde_json::Map::new())
    }

    #[tokio::test]
    async fn empty_step_is_malformed() {
        let executor = StepExecutor::new(Arc::new(StubGateway::new()));
        let step = step_yaml("id: s\nname: S\ntools: []\n");
        let err = executor
            .run(&step, &context(), &mut ResultCache::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedStep { .. }));
    }

    #[tokio::test]
    async fn parallel_step_isolates_failures() {
        let gateway = Arc::new(
            StubGateway::new()
                .respond("a", json!({"ok": 1}))
                .raise("b")
                .respond("c", json!({"ok": 3})),
        );
        let executor = StepExecutor::new(gateway);
        let step = step_yaml(
            "id: s\nname: S\nparallel: true\ntools:\n  - name: a\n  - name: b\n  - name: c\n",
        );
        let result = executor
            .run(&step, &context(), &mut ResultCache::new())
            .await
            .unwrap();

        assert_eq!(result.status, StepStatus::Completed);
        assert_eq!(result.tool_results.len(), 3);
        assert!(result.tool_results[0].success);
        assert!(!result.tool_results[1].success);
        assert!(result.tool_results[1]
            .error
            .as_deref()
            .unwrap()
            .contains("connection refused"));
        assert!(result.tool_results[2].success);
    }

    #[tokio::test]
    async fn parallel_siblings_share_one_context_snapshot() {
        let gateway = Arc::new(
            StubGateway::new()
                .respond("a", json!({"value": 1}))
                .respond("b", json!({"value": 2})),
        );
        let executor = StepExecutor::new(gateway.clone());
        // b references a's output, but siblings resolve against the same
        // snapshot, so the reference stays a placeholder
        let step = step_yaml(
            "id: s\nname: S\nparallel: true\ntools:\n  - name: a\n  - name: b\n    params:\n      from_a: \"{{a.value}}\"\n",
        );
        executor
            .run(&step, &context(), &mut ResultCache::new())
            .await
            .unwrap();

        let calls = gateway.calls();
        let b_call = calls.iter().find(|(name, _)| name == "b").unwrap();
        assert_eq!(b_call.1["from_a"], json!("{{a.value}}"));
    }

    #[tokio::test]
    async fn sequential_tools_see_prior_outputs() {
        let gateway = Arc::new(
            StubGateway::new()
                .respond("search", json!({"top_url": "http://a"}))
                .respond("crawl", json!({"content": "text"})),
        );
        let executor = StepExecutor::new(gateway.clone());
        let step = step_yaml(
            "id: s\nname: S\ntools:\n  - name: search\n  - name: crawl\n    params:\n      url: \"{{search.top_url}}\"\n      alt: \"{{top_url}}\"\n",
        );
        let result = executor
            .run(&step, &context(), &mut ResultCache::new())
            .await
            .unwrap();
        assert_eq!(result.status, StepStatus::Completed);

        let calls = gateway.calls();
        let crawl_call = calls.iter().find(|(name, _)| name == "crawl").unwrap();
        assert_eq!(crawl_call.1["url"], json!("http://a"));
        assert_eq!(crawl_call.1["alt"], json!("http://a"));
    }

    #[tokio::test]
    async fn sequential_business_failure_does_not_abort_later_tools() {
        let gateway = Arc::new(
            StubGateway::new()
                .fail("first", "backend said no")
                .respond("second", json!({"ok": true})),
        );
        let executor = StepExecutor::new(gateway.clone());
        let step = step_yaml("id: s\nname: S\ntools:\n  - name: first\n  - name: second\n");
        let result = executor
            .run(&step, &context(), &mut ResultCache::new())
            .await
            .unwrap();

        assert_eq!(result.tool_results.len(), 2);
        assert!(!result.tool_results[0].success);
        assert!(result.tool_results[1].success);
        assert_eq!(gateway.calls().len(), 2);
    }

    #[tokio::test]
    async fn identical_invocations_in_one_step_hit_cache() {
        let gateway = Arc::new(StubGateway::new().respond("search", json!({"hits": 9})));
        let executor = StepExecutor::new(gateway.clone());
        let step = step_yaml(
            "id: s\nname: S\ntools:\n  - name: search\n    params:\n      q: rust\n  - name: search\n    params:\n      q: rust\n",
        );
        let result = executor
            .run(&step, &context(), &mut ResultCache::new())
            .await
            .unwrap();

        assert_eq!(gateway.calls().len(), 1, "second call served from cache");
        assert_eq!(result.tool_results.len(), 2);
        assert!(!result.tool_results[0].cached);
        assert!(result.tool_results[1].cached);
        assert_eq!(result.tool_results[1].duration_ms, 0);
        assert_eq!(result.tool_results[1].data, Some(json!({"hits": 9})));
    }

    #[tokio::test]
    async fn escalate_policy_fails_step_on_required_tool_failure() {
        let gateway = Arc::new(StubGateway::new().fail("must_work", "backend said no"));
        let step = step_yaml("id: s\nname: S\ntools:\n  - name: must_work\n");

        let degrade = StepExecutor::new(gateway.clone());
        let result = degrade
            .run(&step, &context(), &mut ResultCache::new())
            .await
            .unwrap();
        assert_eq!(result.status, StepStatus::Completed);

        let escalate = StepExecutor::with_policy(gateway, RequiredToolPolicy::Escalate);
        let result = escalate
            .run(&step, &context(), &mut ResultCache::new())
            .await
            .unwrap();
        assert_eq!(result.status, StepStatus::Failed);
        assert!(result.error.as_deref().unwrap().contains("must_work"));
        assert_eq!(result.tool_results.len(), 1);
    }

    #[tokio::test]
    async fn optional_tool_failure_never_escalates() {
        let gateway = Arc::new(StubGateway::new().fail("nice_to_have", "no"));
        let step = step_yaml("id: s\nname: S\ntools:\n  - name: nice_to_have\n    required: false\n");
        let escalate = StepExecutor::with_policy(gateway, RequiredToolPolicy::Escalate);
        let result = escalate
            .run(&step, &context(), &mut ResultCache::new())
            .await
            .unwrap();
        assert_eq!(result.status, StepStatus::Completed);
    }

    #[tokio::test]
    async fn parallel_duplicates_invoke_gateway_once() {
        let gateway = Arc::new(StubGateway::new().respond("search", json!({"hits": 9})));
        let executor = StepExecutor::new(gateway.clone());
        let step = step_yaml(
            "id: s\nname: S\nparallel: true\ntools:\n  - name: search\n    params:\n      q: rust\n  - name: search\n    params:\n      q: rust\n",
        );
        let result = executor
            .run(&step, &context(), &mut ResultCache::new())
            .await
            .unwrap();

        assert_eq!(gateway.calls().len(), 1);
        assert_eq!(result.tool_results.len(), 2);
        assert!(result.tool_results[1].cached);
    }
}
