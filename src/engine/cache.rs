//! Per-execution result cache
//!
//! Memoizes tool responses within one run so an identical (tool, params)
//! invocation never hits the gateway twice. The cache is created fresh for
//! each execution and never shared; only successful responses are stored.

use crate::error::Result;
use crate::gateway::{ToolParams, ToolResponse};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Deterministic cache key over tool name and resolved parameters.
///
/// `serde_json` maps serialize with sorted keys, so the serialization is
/// independent of parameter insertion order.
pub fn cache_key(tool_name: &str, params: &ToolParams) -> Result<String> {
    let serialized = serde_json::to_string(params)?;
    let mut hasher = Sha256::new();
    hasher.update(tool_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(serialized.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[derive(Default)]
pub struct ResultCache {
    entries: HashMap<String, ToolResponse>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ToolResponse> {
        self.entries.get(key)
    }

    /// Store a response; failed responses are not memoized so a transient
    /// error does not poison later invocations
    pub fn set(&mut self, key: String, response: ToolResponse) {
        if response.success {
            self.entries.insert(key, response);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, serde_json::Value)]) -> ToolParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn key_is_deterministic_and_order_independent() {
        let a = params(&[("x", json!(1)), ("y", json!("b"))]);
        let b = params(&[("y", json!("b")), ("x", json!(1))]);
        assert_eq!(
            cache_key("tool", &a).unwrap(),
            cache_key("tool", &b).unwrap()
        );
    }

    #[test]
    fn key_varies_by_tool_and_params() {
        let p = params(&[("x", json!(1))]);
        let q = params(&[("x", json!(2))]);
        assert_ne!(
            cache_key("tool_a", &p).unwrap(),
            cache_key("tool_b", &p).unwrap()
        );
        assert_ne!(
            cache_key("tool_a", &p).unwrap(),
            cache_key("tool_a", &q).unwrap()
        );
    }

    #[test]
    fn only_successful_responses_are_stored() {
        let mut cache = ResultCache::new();
        cache.set("k1".into(), ToolResponse::ok(json!(1), 5));
        cache.set("k2".into(), ToolResponse::err("boom", 5));

        assert!(cache.get("k1").is_some());
        assert!(cache.get("k2").is_none());
        assert_eq!(cache.len(), 1);
    }
}
