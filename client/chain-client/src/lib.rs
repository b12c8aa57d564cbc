//! Siaduan Chain Client
//!
//! Typed access to the three external contracts behind the dashboard:
//!
//! | Contract | Reads | Writes |
//! |---|---|---|
//! | Mock USDC | `balanceOf`, `allowance` | `mint`, `approve` |
//! | Lending vault | `shares`, `getSharePrice`, `getAllocations` | `deposit`, `withdraw` |
//! | Rate coordinator | `rateA`, `rateB` | `reportRates` |
//!
//! The [`ProtocolChain`] trait is what the state store and the action
//! executor consume. [`ChainClient`] implements it over any JSON-RPC
//! [`Transport`]; with the `mock` feature, [`mock::MockChain`] implements
//! it in memory.
//!
//! ## Features
//!
//! - `http`: [`http::HttpTransport`], a reqwest-based JSON-RPC transport
//! - `mock`: in-memory contract simulation for downstream tests

use std::future::Future;

use siaduan_common::{
    Address, ApprovalAmount, PoolRates, ProtocolDetails, SiaduanResult, TxHash, TxReceipt,
    VaultPosition,
};

pub mod abi;
pub mod rpc;
pub mod client;
pub mod wallet;

#[cfg(feature = "http")]
pub mod http;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use client::ChainClient;
pub use rpc::Transport;
pub use wallet::{RpcWallet, WalletConnector, WalletSession};

/// Semantic operations against the token, vault and rate coordinator
///
/// Reads need a provider; submissions additionally need a bound signing
/// account and fail with `Signing` otherwise. No method touches local
/// state: callers decide what to do with the results.
pub trait ProtocolChain: Send + Sync + 'static {
    /// Account submissions are signed with, if one is bound
    fn signer(&self) -> Option<Address>;

    /// Vault address, the spender for deposit allowances
    fn vault(&self) -> Address;

    /// Token balance of `owner` (6 decimals)
    fn read_balance(&self, owner: Address) -> impl Future<Output = SiaduanResult<u128>> + Send;

    /// Token allowance `owner` granted `spender`, saturating at u128::MAX
    fn read_allowance(
        &self,
        owner: Address,
        spender: Address,
    ) -> impl Future<Output = SiaduanResult<u128>> + Send;

    /// Shares of `owner`, share price and pool allocation (three concurrent reads)
    fn read_vault_state(
        &self,
        owner: Address,
    ) -> impl Future<Output = SiaduanResult<VaultPosition>> + Send;

    /// Rates published by the coordinator
    fn read_rates(&self) -> impl Future<Output = SiaduanResult<PoolRates>> + Send;

    /// Vault totals, coordinator timestamp and pool details
    fn read_protocol_details(&self) -> impl Future<Output = SiaduanResult<ProtocolDetails>> + Send;

    /// `token.mint(amount)`
    fn submit_mint(&self, amount: u128) -> impl Future<Output = SiaduanResult<TxHash>> + Send;

    /// `token.approve(spender, amount)`
    fn submit_approve(
        &self,
        spender: Address,
        amount: ApprovalAmount,
    ) -> impl Future<Output = SiaduanResult<TxHash>> + Send;

    /// `vault.deposit(amount)`
    fn submit_deposit(&self, amount: u128) -> impl Future<Output = SiaduanResult<TxHash>> + Send;

    /// `vault.withdraw(shares)`
    fn submit_withdraw(&self, shares: u128) -> impl Future<Output = SiaduanResult<TxHash>> + Send;

    /// `coordinator.reportRates(rate_a, rate_b)`, values passed through unscaled
    fn submit_report_rates(
        &self,
        rate_a: u64,
        rate_b: u64,
    ) -> impl Future<Output = SiaduanResult<TxHash>> + Send;

    /// Wait until `tx_hash` is included; a reverted receipt is an error
    fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = SiaduanResult<TxReceipt>> + Send;
}
