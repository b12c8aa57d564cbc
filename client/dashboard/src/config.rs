//! Dashboard configuration
//!
//! Compiled-in defaults (network, contract addresses, polling cadence)
//! with environment overrides:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `SIADUAN_RPC_URL` | JSON-RPC endpoint |
//! | `SIADUAN_CHAIN_ID` | Expected chain id |
//! | `SIADUAN_APPROVAL` | `unlimited` or `exact` |

use std::time::Duration;

use siaduan_common::constants::{network, timing};
use siaduan_common::{ApprovalPolicy, ChainConfig, ContractAddresses, SiaduanError, SiaduanResult};
use siaduan_protocol_store::StoreConfig;

pub const ENV_RPC_URL: &str = "SIADUAN_RPC_URL";
pub const ENV_CHAIN_ID: &str = "SIADUAN_CHAIN_ID";
pub const ENV_APPROVAL: &str = "SIADUAN_APPROVAL";

/// Everything the binary needs to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub chain: ChainConfig,
    pub contracts: ContractAddresses,
    pub approval: ApprovalPolicy,
    pub refresh_interval: Duration,
}

impl DashboardConfig {
    /// Compiled-in defaults
    pub fn defaults() -> SiaduanResult<Self> {
        Ok(Self {
            chain: ChainConfig::default(),
            contracts: ContractAddresses::deployed()?,
            approval: ApprovalPolicy::default(),
            refresh_interval: Duration::from_secs(timing::REFRESH_INTERVAL_SECS),
        })
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> SiaduanResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`; malformed overrides are errors
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SiaduanResult<Self> {
        let mut config = Self::defaults()?;

        if let Some(url) = lookup(ENV_RPC_URL) {
            let url = url.trim();
            if url.is_empty() {
                return Err(SiaduanError::InvalidInput {
                    param: ENV_RPC_URL,
                    reason: "must not be empty",
                });
            }
            config.chain.rpc_url = url.to_string();
        }

        if let Some(chain_id) = lookup(ENV_CHAIN_ID) {
            let chain_id: u64 = chain_id.trim().parse().map_err(|_| SiaduanError::InvalidInput {
                param: ENV_CHAIN_ID,
                reason: "expected a decimal chain id",
            })?;
            if chain_id != network::CHAIN_ID {
                // explorer links would point at the wrong network
                config.chain.name = format!("chain {chain_id}");
                config.chain.explorer_url.clear();
            }
            config.chain.chain_id = chain_id;
        }

        if let Some(policy) = lookup(ENV_APPROVAL) {
            config.approval = policy.parse()?;
        }

        Ok(config)
    }

    /// Settings for the protocol store
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            expected_chain_id: self.chain.chain_id,
            refresh_interval: self.refresh_interval,
        }
    }
}
