//! Shared test harness: a scriptable tool gateway and workflow builders

use async_trait::async_trait;
use conductor::error::{Error, Result};
use conductor::gateway::{ToolGateway, ToolParams, ToolResponse};
use conductor::workflow::Workflow;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Gateway stub whose per-tool behavior can be changed between runs
#[derive(Default)]
pub struct ScriptedGateway {
    responses: Mutex<HashMap<String, ToolResponse>>,
    raises: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tool replies successfully with `data`
    pub fn respond(&self, tool: &str, data: Value) {
        self.raises.lock().unwrap().remove(tool);
        self.responses
            .lock()
            .unwrap()
            .insert(tool.to_string(), ToolResponse::ok(data, 5));
    }

    /// Tool reports a business-level failure
    pub fn fail(&self, tool: &str, error: &str) {
        self.raises.lock().unwrap().remove(tool);
        self.responses
            .lock()
            .unwrap()
            .insert(tool.to_string(), ToolResponse::err(error, 5));
    }

    /// Tool invocation raises at the gateway layer (e.g. network error)
    pub fn raise(&self, tool: &str) {
        self.raises.lock().unwrap().insert(tool.to_string());
    }

    pub fn call_count(&self, tool: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == tool)
            .count()
    }

    /// Params of the most recent call to `tool`
    pub fn last_params(&self, tool: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(name, _)| name == tool)
            .map(|(_, params)| params.clone())
    }
}

#[async_trait]
impl ToolGateway for ScriptedGateway {
    async fn execute(&self, name: &str, params: &ToolParams) -> Result<ToolResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), Value::Object(params.clone())));
        if self.raises.lock().unwrap().contains(name) {
            return Err(Error::Gateway(format!("network error calling {name}")));
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| ToolResponse::ok(Value::Null, 1)))
    }
}

/// Parse a workflow definition from YAML, panicking on authoring mistakes
pub fn workflow(yaml: &str) -> Workflow {
    serde_yaml::from_str(yaml).expect("test workflow should parse")
}
