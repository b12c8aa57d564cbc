//! JSON-RPC plumbing
//!
//! The [`Transport`] trait is the seam between the typed client and
//! whatever actually carries requests (HTTP, a wallet bridge, a test
//! double). Envelope types and error mapping live here so every transport
//! interprets node errors the same way.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use siaduan_common::rpc_codes;
use siaduan_common::{SiaduanError, SiaduanResult};

/// Carries one JSON-RPC request and returns its `result`
pub trait Transport: Send + Sync + 'static {
    /// Send `method` with positional `params`
    ///
    /// Returns the `result` member (which may be `null`), or the mapped
    /// error member.
    fn request(
        &self,
        method: &'static str,
        params: Value,
    ) -> impl Future<Output = SiaduanResult<Value>> + Send;
}

/// Request envelope
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

impl<'a> RpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Value) -> Self {
        Self { jsonrpc: "2.0", id, method, params }
    }
}

/// Response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    /// Result member, or the mapped error member
    pub fn into_result(self) -> SiaduanResult<Value> {
        if let Some(error) = self.error {
            return Err(error.into_error());
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// JSON-RPC / EIP-1193 error member
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl RpcErrorObject {
    /// Map onto the client error taxonomy
    pub fn into_error(self) -> SiaduanError {
        match self.code {
            rpc_codes::USER_REJECTED => SiaduanError::Rejected { reason: self.message },
            rpc_codes::UNAUTHORIZED => SiaduanError::Signing { reason: self.message },
            // the message already carries the revert reason
            rpc_codes::EXECUTION_REVERTED | rpc_codes::SERVER_ERROR => {
                SiaduanError::Chain { reason: self.message }
            }
            code => SiaduanError::Chain {
                reason: format!("{} (rpc error {code})", self.message),
            },
        }
    }
}

/// `0x`-prefixed lowercase hex
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode a `0x`-prefixed hex string from a JSON value
pub fn bytes_from_value(value: &Value, what: &'static str) -> SiaduanResult<Vec<u8>> {
    let text = value.as_str().ok_or_else(|| SiaduanError::Decode {
        what,
        reason: format!("expected hex string, got {value}"),
    })?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|e| SiaduanError::Decode { what, reason: e.to_string() })
}

/// Decode a hex quantity (`"0x1a"`) from a JSON value
pub fn quantity_from_value(value: &Value, what: &'static str) -> SiaduanResult<u64> {
    let text = value.as_str().ok_or_else(|| SiaduanError::Decode {
        what,
        reason: format!("expected hex quantity, got {value}"),
    })?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16).map_err(|e| SiaduanError::Decode { what, reason: e.to_string() })
}
