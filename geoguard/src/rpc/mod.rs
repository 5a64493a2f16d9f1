pub mod types;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::{GuardError, Result};

use types::{JsonRpcRequest, JsonRpcResponse};

/// HTTP client for a JSON-RPC 2.0 endpoint.
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    client: Client,
    url: String,
    next_id: Arc<AtomicU64>,
}

impl JsonRpcClient {
    pub fn new(url: &str) -> Self {
        Self::with_client(Client::new(), url)
    }

    /// Share an existing `reqwest` connection pool.
    pub fn with_client(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Send a request and return the raw `result` value.
    ///
    /// A JSON-RPC error object becomes [`GuardError::Rpc`] with the server's
    /// message untouched.
    pub async fn request_raw(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        trace!(id, method, "json-rpc request");

        let resp = self.client.post(&self.url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(GuardError::Http {
                status,
                message: body,
            });
        }

        let resp: JsonRpcResponse = resp.json().await?;
        if let Some(err) = resp.error {
            return Err(GuardError::Rpc {
                code: err.code,
                message: err.message,
                data: err.data,
            });
        }
        Ok(resp.result.unwrap_or(serde_json::Value::Null))
    }

    /// Send a request and deserialize the `result`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let value = self.request_raw(method, params).await?;
        serde_json::from_value(value).map_err(GuardError::Json)
    }

    /// Get the endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}
