//! Parameter resolver
//!
//! Substitutes reference templates against the resolution context. A
//! reference that fails to resolve at any path segment logs a warning and
//! falls back to its literal placeholder string; resolution never errors,
//! so a missing upstream value degrades the one tool rather than the run.

use crate::engine::context::ResolutionContext;
use crate::gateway::ToolParams;
use crate::workflow::ParamTemplate;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Resolve a tool's parameter templates into concrete parameters
pub fn resolve_params(
    templates: &BTreeMap<String, ParamTemplate>,
    context: &ResolutionContext,
) -> ToolParams {
    let mut params = ToolParams::new();
    for (key, template) in templates {
        let value = match template {
            ParamTemplate::Literal(value) => value.clone(),
            ParamTemplate::Reference(path) => match context.lookup(path) {
                Some(value) => value,
                None => {
                    let placeholder = ParamTemplate::placeholder(path);
                    warn!(
                        param = %key,
                        reference = %placeholder,
                        "unresolved parameter reference, passing placeholder through"
                    );
                    Value::String(placeholder)
                }
            },
        };
        params.insert(key.clone(), value);
    }
    params
}
