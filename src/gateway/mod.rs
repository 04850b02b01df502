//! Tool gateway boundary
//!
//! The engine is agnostic to what a tool name means; dispatch to concrete
//! backends (search, crawl, generation, analytics) lives entirely behind
//! this trait.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod http;

pub use http::HttpToolGateway;

/// Parameters passed to a tool, fully resolved
pub type ToolParams = Map<String, Value>;

/// Uniform response contract for every tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl ToolResponse {
    pub fn ok(data: Value, duration_ms: u64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            duration_ms,
        }
    }

    pub fn err(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            duration_ms,
        }
    }
}

/// Uniform execution contract over all external tools.
///
/// An `Err` from this trait is an invocation-layer failure (transport,
/// timeout); a `ToolResponse` with `success == false` is a business-level
/// failure reported by the backend. The engine captures both per-tool and
/// neither aborts sibling tools.
#[async_trait]
pub trait ToolGateway: Send + Sync {
    async fn execute(&self, name: &str, params: &ToolParams) -> Result<ToolResponse>;
}
