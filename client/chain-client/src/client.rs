//! JSON-RPC backed implementation of [`ProtocolChain`]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, trace};

use siaduan_common::{
    Address, ApprovalAmount, ConfirmationPolicy, ContractAddresses, PoolAllocation, PoolInfo,
    PoolRates, ProtocolDetails, SiaduanError, SiaduanResult, TxHash, TxReceipt, VaultPosition,
};

use crate::abi::{self, signatures, Token};
use crate::rpc::{self, Transport};
use crate::ProtocolChain;

/// Typed client for the dashboard contracts
///
/// Built without a provider it fails every call with `Connection`; built
/// without a signer it can read but every submission fails with `Signing`.
#[derive(Debug)]
pub struct ChainClient<T> {
    provider: Option<Arc<T>>,
    signer: Option<Address>,
    contracts: ContractAddresses,
    confirmation: ConfirmationPolicy,
}

impl<T> Clone for ChainClient<T> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            signer: self.signer,
            contracts: self.contracts,
            confirmation: self.confirmation,
        }
    }
}

impl<T: Transport> ChainClient<T> {
    /// Client with neither provider nor signer
    pub fn new(contracts: ContractAddresses) -> Self {
        Self {
            provider: None,
            signer: None,
            contracts,
            confirmation: ConfirmationPolicy::default(),
        }
    }

    /// Attach a read provider
    pub fn with_provider(mut self, provider: Arc<T>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Bind a signing account
    pub fn with_signer(mut self, signer: Address) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Override receipt polling
    pub fn with_confirmation_policy(mut self, policy: ConfirmationPolicy) -> Self {
        self.confirmation = policy;
        self
    }

    /// Contract addresses in use
    pub fn contracts(&self) -> &ContractAddresses {
        &self.contracts
    }

    fn provider(&self) -> SiaduanResult<&T> {
        self.provider
            .as_deref()
            .ok_or(SiaduanError::Connection { reason: "no provider configured" })
    }

    fn signing_account(&self) -> SiaduanResult<Address> {
        self.signer.ok_or_else(|| SiaduanError::Signing {
            reason: "no signing identity bound".into(),
        })
    }

    async fn call(&self, to: Address, data: Vec<u8>, what: &'static str) -> SiaduanResult<Vec<u8>> {
        let provider = self.provider()?;
        trace!(%to, what, "eth_call");
        let params = json!([{ "to": to.to_string(), "data": rpc::to_hex(&data) }, "latest"]);
        let result = provider.request("eth_call", params).await?;
        rpc::bytes_from_value(&result, what)
    }

    async fn read_uint(&self, to: Address, data: Vec<u8>, what: &'static str) -> SiaduanResult<u128> {
        let ret = self.call(to, data, what).await?;
        abi::decode_uint(&ret, 0, what)
    }

    async fn read_u64(&self, to: Address, data: Vec<u8>, what: &'static str) -> SiaduanResult<u64> {
        let ret = self.call(to, data, what).await?;
        abi::decode_u64(&ret, 0, what)
    }

    async fn send(&self, to: Address, data: Vec<u8>, what: &'static str) -> SiaduanResult<TxHash> {
        let provider = self.provider()?;
        let from = self.signing_account()?;
        let params = json!([{
            "from": from.to_string(),
            "to": to.to_string(),
            "data": rpc::to_hex(&data),
        }]);
        let result = provider.request("eth_sendTransaction", params).await?;
        let tx_hash: TxHash = result
            .as_str()
            .ok_or_else(|| SiaduanError::Decode {
                what: "transaction hash",
                reason: format!("expected string, got {result}"),
            })?
            .parse()?;
        debug!(%tx_hash, %to, what, "transaction submitted");
        Ok(tx_hash)
    }

    async fn fetch_receipt(&self, tx_hash: TxHash) -> SiaduanResult<Option<TxReceipt>> {
        let provider = self.provider()?;
        let result = provider
            .request("eth_getTransactionReceipt", json!([tx_hash.to_string()]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        parse_receipt(tx_hash, &result).map(Some)
    }

    async fn poll_receipt(&self, tx_hash: TxHash) -> SiaduanResult<TxReceipt> {
        let interval = Duration::from_millis(self.confirmation.poll_interval_ms);
        loop {
            if let Some(receipt) = self.fetch_receipt(tx_hash).await? {
                return Ok(receipt);
            }
            trace!(%tx_hash, "receipt not available yet");
            tokio::time::sleep(interval).await;
        }
    }

    async fn read_pool(&self, pool: Address) -> SiaduanResult<PoolInfo> {
        let asset = Token::Address(self.contracts.token);
        let (name, supply_rate, total_deposits) = tokio::try_join!(
            self.call(pool, abi::encode_call(signatures::pool::POOL_NAME, &[]), "poolName"),
            self.read_uint(
                pool,
                abi::encode_call(signatures::pool::GET_SUPPLY_RATE, &[asset]),
                "getSupplyRate",
            ),
            self.read_uint(
                pool,
                abi::encode_call(signatures::pool::GET_TOTAL_DEPOSITS, &[asset]),
                "getTotalDeposits",
            ),
        )?;
        Ok(PoolInfo {
            address: pool,
            name: abi::decode_string(&name, "poolName")?,
            supply_rate,
            total_deposits,
        })
    }
}

fn parse_receipt(tx_hash: TxHash, receipt: &Value) -> SiaduanResult<TxReceipt> {
    // Pre-Byzantium receipts carry no status; treat them as successful
    if let Some(status) = receipt.get("status").filter(|s| !s.is_null()) {
        if rpc::quantity_from_value(status, "receipt status")? == 0 {
            return Err(SiaduanError::chain(format!("transaction {tx_hash} reverted")));
        }
    }
    let block_number = match receipt.get("blockNumber") {
        Some(v) if !v.is_null() => rpc::quantity_from_value(v, "receipt blockNumber")?,
        _ => 0,
    };
    let gas_used = match receipt.get("gasUsed") {
        Some(v) if !v.is_null() => rpc::quantity_from_value(v, "receipt gasUsed")?,
        _ => 0,
    };
    Ok(TxReceipt { tx_hash, block_number, gas_used })
}

impl<T: Transport> ProtocolChain for ChainClient<T> {
    fn signer(&self) -> Option<Address> {
        self.signer
    }

    fn vault(&self) -> Address {
        self.contracts.vault
    }

    async fn read_balance(&self, owner: Address) -> SiaduanResult<u128> {
        let data = abi::encode_call(signatures::token::BALANCE_OF, &[Token::Address(owner)]);
        self.read_uint(self.contracts.token, data, "balanceOf").await
    }

    async fn read_allowance(&self, owner: Address, spender: Address) -> SiaduanResult<u128> {
        let data = abi::encode_call(
            signatures::token::ALLOWANCE,
            &[Token::Address(owner), Token::Address(spender)],
        );
        let ret = self.call(self.contracts.token, data, "allowance").await?;
        abi::decode_uint_saturating(&ret, 0, "allowance")
    }

    async fn read_vault_state(&self, owner: Address) -> SiaduanResult<VaultPosition> {
        let vault = self.contracts.vault;
        let (shares, share_price, allocations) = tokio::try_join!(
            self.read_uint(
                vault,
                abi::encode_call(signatures::vault::SHARES, &[Token::Address(owner)]),
                "shares",
            ),
            self.read_uint(
                vault,
                abi::encode_call(signatures::vault::GET_SHARE_PRICE, &[]),
                "getSharePrice",
            ),
            self.call(
                vault,
                abi::encode_call(signatures::vault::GET_ALLOCATIONS, &[]),
                "getAllocations",
            ),
        )?;
        let allocation = PoolAllocation {
            pool_a: abi::decode_uint(&allocations, 0, "getAllocations")?,
            pool_b: abi::decode_uint(&allocations, 1, "getAllocations")?,
            idle: abi::decode_uint(&allocations, 2, "getAllocations")?,
        };
        Ok(VaultPosition { shares, share_price, allocation })
    }

    async fn read_rates(&self) -> SiaduanResult<PoolRates> {
        let coordinator = self.contracts.rate_coordinator;
        let (rate_a, rate_b) = tokio::try_join!(
            self.read_u64(
                coordinator,
                abi::encode_call(signatures::coordinator::RATE_A, &[]),
                "rateA",
            ),
            self.read_u64(
                coordinator,
                abi::encode_call(signatures::coordinator::RATE_B, &[]),
                "rateB",
            ),
        )?;
        Ok(PoolRates { rate_a, rate_b })
    }

    async fn read_protocol_details(&self) -> SiaduanResult<ProtocolDetails> {
        let vault = self.contracts.vault;
        let (total_shares, total_assets, rebalance_threshold, last_rate_update, pool_a, pool_b) = tokio::try_join!(
            self.read_uint(
                vault,
                abi::encode_call(signatures::vault::TOTAL_SHARES, &[]),
                "totalShares",
            ),
            self.read_uint(
                vault,
                abi::encode_call(signatures::vault::GET_TOTAL_ASSETS, &[]),
                "getTotalAssets",
            ),
            self.read_uint(
                vault,
                abi::encode_call(signatures::vault::REBALANCE_THRESHOLD, &[]),
                "rebalanceThreshold",
            ),
            self.read_u64(
                self.contracts.rate_coordinator,
                abi::encode_call(signatures::coordinator::LAST_UPDATE, &[]),
                "lastUpdate",
            ),
            self.read_pool(self.contracts.pool_a),
            self.read_pool(self.contracts.pool_b),
        )?;
        Ok(ProtocolDetails {
            total_shares,
            total_assets,
            rebalance_threshold,
            last_rate_update,
            pools: vec![pool_a, pool_b],
        })
    }

    async fn submit_mint(&self, amount: u128) -> SiaduanResult<TxHash> {
        let data = abi::encode_call(signatures::token::MINT, &[Token::Uint(amount)]);
        self.send(self.contracts.token, data, "mint").await
    }

    async fn submit_approve(&self, spender: Address, amount: ApprovalAmount) -> SiaduanResult<TxHash> {
        let value = match amount {
            ApprovalAmount::Exact(v) => Token::Uint(v),
            ApprovalAmount::Unlimited => Token::MaxUint,
        };
        let data = abi::encode_call(signatures::token::APPROVE, &[Token::Address(spender), value]);
        self.send(self.contracts.token, data, "approve").await
    }

    async fn submit_deposit(&self, amount: u128) -> SiaduanResult<TxHash> {
        let data = abi::encode_call(signatures::vault::DEPOSIT, &[Token::Uint(amount)]);
        self.send(self.contracts.vault, data, "deposit").await
    }

    async fn submit_withdraw(&self, shares: u128) -> SiaduanResult<TxHash> {
        let data = abi::encode_call(signatures::vault::WITHDRAW, &[Token::Uint(shares)]);
        self.send(self.contracts.vault, data, "withdraw").await
    }

    async fn submit_report_rates(&self, rate_a: u64, rate_b: u64) -> SiaduanResult<TxHash> {
        let data = abi::encode_call(
            signatures::coordinator::REPORT_RATES,
            &[Token::Uint(rate_a as u128), Token::Uint(rate_b as u128)],
        );
        self.send(self.contracts.rate_coordinator, data, "reportRates").await
    }

    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> SiaduanResult<TxReceipt> {
        let limit = Duration::from_secs(self.confirmation.timeout_secs);
        match tokio::time::timeout(limit, self.poll_receipt(tx_hash)).await {
            Ok(result) => {
                if let Ok(receipt) = &result {
                    debug!(%tx_hash, block = receipt.block_number, "transaction confirmed");
                }
                result
            }
            Err(_) => Err(SiaduanError::ConfirmationTimeout {
                tx_hash,
                waited_secs: self.confirmation.timeout_secs,
            }),
        }
    }
}
