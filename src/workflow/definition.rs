//! Immutable workflow definitions
//!
//! A workflow is an ordered list of steps; each step names one or more
//! tools with parameter templates. Definitions are authored statically
//! (YAML or JSON) and never mutated at runtime.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A named, ordered list of steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Stable workflow identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Steps in author-declared execution order
    pub steps: Vec<WorkflowStep>,
}

/// A unit of execution containing one or more tool invocations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Stable step identifier, referenced by `depends_on`
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Run this step's tools concurrently rather than one after another
    #[serde(default)]
    pub parallel: bool,
    /// Tools to invoke
    pub tools: Vec<WorkflowTool>,
    /// Step ids that must have completed before this step may run
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Optional hint for downstream rendering of this step's output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
}

/// A named external capability invoked through the tool gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTool {
    /// Tool name, dispatched by the gateway
    pub name: String,
    /// Parameter templates, resolved against the run context
    #[serde(default)]
    pub params: BTreeMap<String, ParamTemplate>,
    /// Whether a failure of this tool is logged at error severity
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// A parameter value as authored: either a literal, or a reference to a
/// context entry written as `{{name}}` / `{{name.path}}`.
///
/// The distinction is made once, at deserialization time, so the executor
/// never re-scans literal values for placeholder syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamTemplate {
    /// Passed through unchanged
    Literal(Value),
    /// Resolved against the run context; path segments split on `.`
    Reference(Vec<String>),
}

impl ParamTemplate {
    /// Parse a string as a reference token if it is exactly `{{path}}`
    pub fn from_value(value: Value) -> Self {
        if let Value::String(s) = &value {
            if let Some(path) = reference_path(s) {
                return ParamTemplate::Reference(path);
            }
        }
        ParamTemplate::Literal(value)
    }

    /// The original placeholder form of a reference, used as the fallback
    /// value when resolution fails
    pub fn placeholder(path: &[String]) -> String {
        format!("{{{{{}}}}}", path.join("."))
    }
}

/// Extract the dotted path from an exact `{{identifier(.segment)*}}` token.
///
/// Partial placeholders embedded in longer strings are not references; they
/// pass through as literals.
fn reference_path(s: &str) -> Option<Vec<String>> {
    let inner = s.strip_prefix("{{")?.strip_suffix("}}")?.trim();
    if inner.is_empty() || inner.contains("{{") {
        return None;
    }
    let segments: Vec<String> = inner.split('.').map(|p| p.trim().to_string()).collect();
    if segments.iter().any(|p| {
        p.is_empty()
            || !p
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }) {
        return None;
    }
    Some(segments)
}

impl Serialize for ParamTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamTemplate::Literal(v) => v.serialize(serializer),
            ParamTemplate::Reference(path) => Self::placeholder(path).serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ParamTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(ParamTemplate::from_value(value))
    }
}
