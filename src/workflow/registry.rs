//! Workflow lookup and file loading
//!
//! The engine never owns a process-wide registry; callers construct a
//! lookup and inject it. The in-memory registry can be seeded directly or
//! loaded from YAML definition files.

use crate::error::{Error, Result};
use crate::workflow::Workflow;
use std::collections::HashMap;
use std::path::Path;

/// Read-only lookup of workflow definitions by id
pub trait WorkflowLookup: Send + Sync {
    /// Fetch a workflow definition, if registered
    fn get(&self, workflow_id: &str) -> Option<Workflow>;

    /// Ids of all registered workflows
    fn list(&self) -> Vec<String>;
}

/// Simple map-backed registry, seeded at construction time
#[derive(Default)]
pub struct InMemoryWorkflowRegistry {
    workflows: HashMap<String, Workflow>,
}

impl InMemoryWorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a workflow, replacing any existing definition with its id
    pub fn register(&mut self, workflow: Workflow) {
        self.workflows.insert(workflow.id.clone(), workflow);
    }

    /// Load a single workflow definition from a YAML file
    pub fn load_file(&mut self, path: &Path) -> Result<String> {
        let content = std::fs::read_to_string(path)?;
        let workflow: Workflow = serde_yaml::from_str(&content)?;
        let id = workflow.id.clone();
        self.register(workflow);
        Ok(id)
    }

    /// Load every `.yml`/`.yaml` file in a directory as a workflow
    pub fn load_dir(&mut self, dir: &Path) -> Result<Vec<String>> {
        let mut loaded = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == "yml" || e == "yaml");
            if is_yaml {
                loaded.push(self.load_file(&path)?);
            }
        }
        loaded.sort();
        Ok(loaded)
    }
}

impl WorkflowLookup for InMemoryWorkflowRegistry {
    fn get(&self, workflow_id: &str) -> Option<Workflow> {
        self.workflows.get(workflow_id).cloned()
    }

    fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.workflows.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Resolve a workflow id through a lookup, surfacing a typed error
pub fn require_workflow(lookup: &dyn WorkflowLookup, workflow_id: &str) -> Result<Workflow> {
    lookup
        .get(workflow_id)
        .ok_or_else(|| Error::WorkflowNotFound(workflow_id.to_string()))
}
