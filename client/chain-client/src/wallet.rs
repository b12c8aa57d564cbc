//! Wallet connection
//!
//! A [`WalletConnector`] is whatever hands the store an account, a chain id
//! and a client bound to them. [`RpcWallet`] does it over a JSON-RPC
//! transport the way an EIP-1193 provider does: `eth_accounts`, falling
//! back to `eth_requestAccounts`, then `eth_chainId`.

use std::future::Future;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use siaduan_common::{
    Address, ConfirmationPolicy, ContractAddresses, SiaduanError, SiaduanResult,
};

use crate::client::ChainClient;
use crate::rpc::{self, Transport};
use crate::ProtocolChain;

/// Everything a successful wallet connection yields
#[derive(Debug, Clone)]
pub struct WalletSession<C> {
    /// Connected account
    pub account: Address,
    /// Chain id the wallet is on
    pub chain_id: u64,
    /// Client bound to the wallet's provider (and signer, on the expected chain)
    pub client: C,
}

/// Source of wallet sessions
pub trait WalletConnector: Send + Sync {
    /// Client type the connector produces
    type Chain: ProtocolChain;

    /// Establish a session
    fn connect(&self) -> impl Future<Output = SiaduanResult<WalletSession<Self::Chain>>> + Send;
}

/// Wallet backed by a JSON-RPC transport
pub struct RpcWallet<T> {
    transport: Arc<T>,
    contracts: ContractAddresses,
    expected_chain_id: u64,
    confirmation: ConfirmationPolicy,
}

impl<T: Transport> RpcWallet<T> {
    pub fn new(transport: Arc<T>, contracts: ContractAddresses, expected_chain_id: u64) -> Self {
        Self {
            transport,
            contracts,
            expected_chain_id,
            confirmation: ConfirmationPolicy::default(),
        }
    }

    /// Override receipt polling for clients this wallet builds
    pub fn with_confirmation_policy(mut self, policy: ConfirmationPolicy) -> Self {
        self.confirmation = policy;
        self
    }

    async fn first_account(&self, method: &'static str) -> SiaduanResult<Option<Address>> {
        let result = self.transport.request(method, json!([])).await?;
        let accounts = match result {
            Value::Array(accounts) => accounts,
            Value::Null => Vec::new(),
            other => {
                return Err(SiaduanError::Decode {
                    what: "accounts",
                    reason: format!("expected array, got {other}"),
                })
            }
        };
        match accounts.first().and_then(Value::as_str) {
            Some(account) => Ok(Some(account.parse()?)),
            None => Ok(None),
        }
    }
}

impl<T: Transport> WalletConnector for RpcWallet<T> {
    type Chain = ChainClient<T>;

    async fn connect(&self) -> SiaduanResult<WalletSession<ChainClient<T>>> {
        let account = match self.first_account("eth_accounts").await? {
            Some(account) => account,
            None => self
                .first_account("eth_requestAccounts")
                .await?
                .ok_or_else(|| SiaduanError::Signing {
                    reason: "wallet exposed no accounts".into(),
                })?,
        };

        let chain_id = rpc::quantity_from_value(
            &self.transport.request("eth_chainId", json!([])).await?,
            "chainId",
        )?;

        let mut client = ChainClient::new(self.contracts)
            .with_provider(self.transport.clone())
            .with_confirmation_policy(self.confirmation);
        if chain_id == self.expected_chain_id {
            client = client.with_signer(account);
            info!(%account, chain_id, "wallet connected");
        } else {
            warn!(
                %account,
                chain_id,
                expected = self.expected_chain_id,
                "wallet connected to the wrong network; signing disabled"
            );
        }

        Ok(WalletSession { account, chain_id, client })
    }
}
