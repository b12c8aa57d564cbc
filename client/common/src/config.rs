//! Network and Contract Configuration
//!
//! Compiled-in defaults come from [`crate::constants`]; the dashboard
//! binary layers environment overrides on top.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{addresses, network, timing};
use crate::errors::{SiaduanError, SiaduanResult};
use crate::types::{Address, ApprovalAmount, TxHash};

/// Addresses of every contract the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    /// Mock USDC token
    pub token: Address,
    /// Lending vault (also the allowance spender)
    pub vault: Address,
    /// Rate coordinator
    pub rate_coordinator: Address,
    /// Mock lending pool A
    pub pool_a: Address,
    /// Mock lending pool B
    pub pool_b: Address,
}

impl ContractAddresses {
    /// The deployed demo contracts
    pub fn deployed() -> SiaduanResult<Self> {
        Ok(Self {
            token: addresses::MOCK_USDC.parse()?,
            vault: addresses::LENDING_VAULT.parse()?,
            rate_coordinator: addresses::RATE_COORDINATOR.parse()?,
            pool_a: addresses::POOL_A.parse()?,
            pool_b: addresses::POOL_B.parse()?,
        })
    }
}

/// The network mutating actions are meant for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Expected chain id
    pub chain_id: u64,
    /// Display name
    pub name: String,
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// Block explorer base URL (empty when none)
    pub explorer_url: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: network::CHAIN_ID,
            name: network::NAME.to_string(),
            rpc_url: network::RPC_URL.to_string(),
            explorer_url: network::EXPLORER_URL.to_string(),
        }
    }
}

impl ChainConfig {
    /// Explorer link for a transaction, if the network has an explorer
    pub fn tx_url(&self, tx_hash: &TxHash) -> Option<String> {
        if self.explorer_url.is_empty() {
            return None;
        }
        Some(format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash))
    }
}

/// How much allowance a deposit asks for when the current one is short
///
/// `Unlimited` approves max uint256, so one approval covers every later
/// deposit. `Exact` approves only the amount being deposited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApprovalPolicy {
    #[default]
    Unlimited,
    Exact,
}

impl ApprovalPolicy {
    /// Allowance to request for a deposit of `amount`
    pub fn allowance_for(&self, amount: u128) -> ApprovalAmount {
        match self {
            ApprovalPolicy::Unlimited => ApprovalAmount::Unlimited,
            ApprovalPolicy::Exact => ApprovalAmount::Exact(amount),
        }
    }
}

impl FromStr for ApprovalPolicy {
    type Err = SiaduanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unlimited" | "max" => Ok(ApprovalPolicy::Unlimited),
            "exact" => Ok(ApprovalPolicy::Exact),
            _ => Err(SiaduanError::InvalidInput {
                param: "approval policy",
                reason: "expected unlimited or exact",
            }),
        }
    }
}

/// Receipt polling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationPolicy {
    /// Delay between receipt polls (milliseconds)
    pub poll_interval_ms: u64,
    /// Overall wait limit (seconds)
    pub timeout_secs: u64,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            poll_interval_ms: timing::RECEIPT_POLL_INTERVAL_MS,
            timeout_secs: timing::CONFIRMATION_TIMEOUT_SECS,
        }
    }
}
