//! HTTP JSON-RPC transport
//!
//! Posts one JSON-RPC envelope per request. Submissions go through
//! `eth_sendTransaction`, so the endpoint must manage the signing account
//! itself (a local dev node with unlocked accounts, or a wallet bridge).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;
use tracing::trace;

use siaduan_common::{SiaduanError, SiaduanResult};

use crate::rpc::{RpcRequest, RpcResponse, Transport};

/// Per-request HTTP timeout
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// reqwest-backed [`Transport`]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> SiaduanResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SiaduanError::transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    async fn request(&self, method: &'static str, params: Value) -> SiaduanResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!(id, method, "rpc request");

        let response = self
            .client
            .post(&self.url)
            .json(&RpcRequest::new(id, method, params))
            .send()
            .await
            .map_err(|e| SiaduanError::transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| SiaduanError::transport(e.to_string()))?;

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| SiaduanError::transport(format!("malformed response: {e}")))?;
        envelope.into_result()
    }
}
