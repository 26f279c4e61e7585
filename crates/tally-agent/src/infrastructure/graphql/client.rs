//! GraphQL-over-HTTP 传输层
//!
//! 请求体固定为 `{query, variables}`；非 2xx、响应体不可解析、或
//! 顶层 errors 列表非空都算传输层失败（可重试）。结构完好的
//! mutation 负载里的业务拒绝由仓储层分类为校验错误（不重试）。

use serde_json::{Value, json};
use std::time::Duration;
use tally_core::error::{Result, SyncError};
use tracing::debug;

pub struct GraphQlClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GraphQlClient {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, endpoint })
    }

    /// 执行一次查询/变更，返回顶层 `data`
    pub async fn execute(&self, query: &str, variables: Value) -> Result<Value> {
        let payload = json!({
            "query": query,
            "variables": variables,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SyncError::transport(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::transport(format!(
                "Server returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SyncError::transport(format!("Malformed response body: {}", e)))?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                return Err(SyncError::transport(format!(
                    "GraphQL errors: {}",
                    Value::Array(errors.clone())
                )));
            }
        }

        debug!(endpoint = %self.endpoint, "GraphQL call succeeded");
        body.get("data")
            .cloned()
            .ok_or_else(|| SyncError::transport("Response missing data field"))
    }
}
