//! Resolution context
//!
//! The flattened lookup table of the original user query plus every prior
//! tool's output. Each successful tool's data lands under its tool name;
//! object-shaped data is additionally spread by top-level field, enabling
//! both `{{toolName}}` and `{{fieldName}}` lookups. One context is owned
//! by exactly one run and is never shared across executions.

use serde_json::{Map, Value};

/// Fixed context key carrying the original user query
pub const QUERY_KEY: &str = "query";

#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    values: Map<String, Value>,
}

impl ResolutionContext {
    /// Build the initial context from the user query and explicit parameters
    pub fn new(user_query: &str, parameters: Map<String, Value>) -> Self {
        let mut values = Map::new();
        values.insert(QUERY_KEY.to_string(), Value::String(user_query.to_string()));
        for (key, value) in parameters {
            values.insert(key, value);
        }
        Self { values }
    }

    /// Rebuild a context from a checkpointed snapshot
    pub fn from_snapshot(snapshot: Value) -> Self {
        match snapshot {
            Value::Object(values) => Self { values },
            _ => Self::default(),
        }
    }

    /// Fold a tool's returned data into the context.
    ///
    /// Spread fields go in first so the tool-name entry wins any collision
    /// between a tool name and another tool's field.
    pub fn absorb_tool_output(&mut self, tool_name: &str, data: &Value) {
        if let Value::Object(fields) = data {
            for (key, value) in fields {
                self.values.insert(key.clone(), value.clone());
            }
        }
        self.values.insert(tool_name.to_string(), data.clone());
    }

    /// Walk a dotted path through the context.
    ///
    /// The first segment is a direct context lookup; later segments descend
    /// through object fields, with numeric segments indexing arrays.
    pub fn lookup(&self, path: &[String]) -> Option<Value> {
        let mut current = self.values.get(path.first()?)?;
        for segment in &path[1..] {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }

    /// Serialize the whole context for checkpointing
    pub fn snapshot(&self) -> Value {
        Value::Object(self.values.clone())
    }
}
