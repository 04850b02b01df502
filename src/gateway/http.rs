//! HTTP tool gateway
//!
//! Posts `{name, params}` to `<base>/tools/<name>` and parses the uniform
//! response contract. Transport failures surface as gateway errors; non-2xx
//! statuses become failed responses so callers see a per-tool error rather
//! than an aborted step.

use crate::error::Result;
use crate::gateway::{ToolGateway, ToolParams, ToolResponse};
use async_trait::async_trait;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct HttpToolGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpToolGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = match reqwest::Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "failed to build HTTP client, falling back to default without timeout");
                reqwest::Client::new()
            }
        };
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn tool_url(&self, name: &str) -> String {
        format!("{}/tools/{}", self.base_url, name)
    }
}

#[async_trait]
impl ToolGateway for HttpToolGateway {
    async fn execute(&self, name: &str, params: &ToolParams) -> Result<ToolResponse> {
        let started = Instant::now();
        let response = self
            .client
            .post(self.tool_url(name))
            .json(&json!({ "name": name, "params": params }))
            .send()
            .await?;

        let elapsed = started.elapsed().as_millis() as u64;
        let status = response.status();
        debug!(tool = name, %status, elapsed_ms = elapsed, "tool gateway response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(ToolResponse::err(
                format!("tool '{}' returned HTTP {}: {}", name, status, body),
                elapsed,
            ));
        }

        let mut parsed: ToolResponse = response.json().await?;
        parsed.duration_ms = elapsed;
        Ok(parsed)
    }
}
