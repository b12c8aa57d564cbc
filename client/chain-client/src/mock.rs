//! In-memory contract simulation
//!
//! [`MockChain`] plays the token, the vault and the rate coordinator
//! closely enough for the store and the executor to be tested end to end:
//! allowances are enforced at deposit time, state changes land only when a
//! transaction is confirmed, and every call is recorded in order.
//!
//! Failure injection covers failing reads, user rejection, reverted
//! receipts and slow reads / confirmations (for use with paused tokio time).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use siaduan_common::constants::shares::PRICE_ONE;
use siaduan_common::{
    Address, ApprovalAmount, PoolAllocation, PoolInfo, PoolRates, ProtocolDetails, SiaduanError,
    SiaduanResult, TxHash, TxReceipt, VaultPosition,
};

use crate::wallet::{WalletConnector, WalletSession};
use crate::ProtocolChain;

/// Gas reported for every mock receipt
const MOCK_GAS_USED: u64 = 50_000;

/// Every call the mock has seen, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ReadBalance(Address),
    ReadAllowance { owner: Address, spender: Address },
    ReadShares(Address),
    ReadSharePrice,
    ReadAllocations,
    ReadRates,
    ReadDetails,
    Mint(u128),
    Approve { spender: Address, amount: ApprovalAmount },
    Deposit(u128),
    Withdraw(u128),
    ReportRates { rate_a: u64, rate_b: u64 },
    Wait(TxHash),
}

impl MockCall {
    /// Returns true for transaction submissions
    pub fn is_submission(&self) -> bool {
        matches!(
            self,
            MockCall::Mint(_)
                | MockCall::Approve { .. }
                | MockCall::Deposit(_)
                | MockCall::Withdraw(_)
                | MockCall::ReportRates { .. }
        )
    }
}

/// Reads that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockRead {
    Balance,
    Allowance,
    Shares,
    SharePrice,
    Allocations,
    Rates,
    Details,
}

#[derive(Debug, Clone, Copy)]
enum PendingTx {
    Mint { to: Address, amount: u128 },
    Approve { owner: Address, spender: Address, amount: u128 },
    Deposit { owner: Address, amount: u128 },
    Withdraw { owner: Address, shares: u128 },
    ReportRates { rate_a: u64, rate_b: u64 },
}

/// Simulated contract storage
#[derive(Debug, Default)]
struct MockLedger {
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
    shares: HashMap<Address, u128>,
    total_shares: u128,
    allocation: PoolAllocation,
    rates: PoolRates,
    last_rate_update: u64,
    pending: HashMap<TxHash, PendingTx>,
    next_tx: u64,
    block: u64,
    calls: Vec<MockCall>,
    failing_reads: HashSet<MockRead>,
    reject_submissions: bool,
    revert_confirmations: bool,
    read_delay: Option<Duration>,
    confirmation_delay: Option<Duration>,
}

impl MockLedger {
    fn total_assets(&self) -> u128 {
        self.allocation.total()
    }

    fn share_price(&self) -> u128 {
        if self.total_shares == 0 {
            return PRICE_ONE;
        }
        self.total_assets() * PRICE_ONE / self.total_shares
    }

    fn check_read(&self, read: MockRead) -> SiaduanResult<()> {
        if self.failing_reads.contains(&read) {
            return Err(SiaduanError::chain(format!("execution reverted: {read:?} read failed")));
        }
        Ok(())
    }

    fn queue(&mut self, tx: PendingTx) -> SiaduanResult<TxHash> {
        if self.reject_submissions {
            return Err(SiaduanError::Rejected {
                reason: "User denied transaction signature".into(),
            });
        }
        self.next_tx += 1;
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&self.next_tx.to_be_bytes());
        let hash = TxHash(bytes);
        self.pending.insert(hash, tx);
        Ok(hash)
    }

    fn apply(&mut self, tx: PendingTx) -> SiaduanResult<()> {
        match tx {
            PendingTx::Mint { to, amount } => {
                *self.balances.entry(to).or_default() += amount;
            }
            PendingTx::Approve { owner, spender, amount } => {
                self.allowances.insert((owner, spender), amount);
            }
            PendingTx::Deposit { owner, amount } => {
                let spender = MockChain::VAULT;
                let balance = self.balances.get(&owner).copied().unwrap_or(0);
                if balance < amount {
                    return Err(SiaduanError::chain("execution reverted: ERC20: transfer amount exceeds balance"));
                }
                let allowance = self.allowances.get(&(owner, spender)).copied().unwrap_or(0);
                if allowance < amount {
                    return Err(SiaduanError::chain("execution reverted: ERC20: insufficient allowance"));
                }
                if allowance != u128::MAX {
                    self.allowances.insert((owner, spender), allowance - amount);
                }
                let total_assets = self.total_assets();
                let minted = if self.total_shares == 0 || total_assets == 0 {
                    amount
                } else {
                    amount * self.total_shares / total_assets
                };
                self.balances.insert(owner, balance - amount);
                *self.shares.entry(owner).or_default() += minted;
                self.total_shares += minted;
                self.allocation.idle += amount;
            }
            PendingTx::Withdraw { owner, shares } => {
                let held = self.shares.get(&owner).copied().unwrap_or(0);
                if held < shares || shares == 0 {
                    return Err(SiaduanError::chain("execution reverted: insufficient shares"));
                }
                let mut amount = shares * self.total_assets() / self.total_shares;
                self.shares.insert(owner, held - shares);
                self.total_shares -= shares;
                *self.balances.entry(owner).or_default() += amount;
                for bucket in [
                    &mut self.allocation.idle,
                    &mut self.allocation.pool_a,
                    &mut self.allocation.pool_b,
                ] {
                    let taken = amount.min(*bucket);
                    *bucket -= taken;
                    amount -= taken;
                }
            }
            PendingTx::ReportRates { rate_a, rate_b } => {
                self.rates = PoolRates { rate_a, rate_b };
                self.last_rate_update = self.block;
            }
        }
        Ok(())
    }
}

/// In-memory stand-in for the three contracts
///
/// Clones share the same ledger; [`MockChain::with_signer`] produces a view
/// with a different (or no) signing account.
#[derive(Debug, Clone, Default)]
pub struct MockChain {
    ledger: Arc<Mutex<MockLedger>>,
    signer: Option<Address>,
}

impl MockChain {
    /// Vault address used by the mock
    pub const VAULT: Address = Address([0xee; 20]);
    /// Pool A address used by the mock
    pub const POOL_A: Address = Address([0xa1; 20]);
    /// Pool B address used by the mock
    pub const POOL_B: Address = Address([0xb1; 20]);

    /// Empty chain, no signer
    pub fn new() -> Self {
        Self::default()
    }

    /// View of the same ledger signing as `signer`
    pub fn with_signer(&self, signer: Option<Address>) -> Self {
        Self {
            ledger: self.ledger.clone(),
            signer,
        }
    }

    fn with_ledger<R>(&self, f: impl FnOnce(&mut MockLedger) -> R) -> R {
        f(&mut self.ledger.lock())
    }

    // ============ Setup ============

    pub fn set_balance(&self, owner: Address, amount: u128) {
        self.with_ledger(|l| l.balances.insert(owner, amount));
    }

    pub fn set_allowance(&self, owner: Address, spender: Address, amount: u128) {
        self.with_ledger(|l| l.allowances.insert((owner, spender), amount));
    }

    pub fn set_rates(&self, rate_a: u64, rate_b: u64) {
        self.with_ledger(|l| l.rates = PoolRates { rate_a, rate_b });
    }

    /// Give `owner` vault shares backed one-to-one by assets spread over
    /// the pools
    pub fn seed_position(&self, owner: Address, allocation: PoolAllocation) {
        self.with_ledger(|l| {
            let assets = allocation.total();
            *l.shares.entry(owner).or_default() += assets;
            l.total_shares += assets;
            l.allocation.pool_a += allocation.pool_a;
            l.allocation.pool_b += allocation.pool_b;
            l.allocation.idle += allocation.idle;
        });
    }

    /// Accrue yield to pool A without minting shares (raises share price)
    pub fn accrue_yield(&self, amount: u128) {
        self.with_ledger(|l| l.allocation.pool_a += amount);
    }

    // ============ Failure injection ============

    pub fn fail_read(&self, read: MockRead) {
        self.with_ledger(|l| l.failing_reads.insert(read));
    }

    pub fn clear_read_failures(&self) {
        self.with_ledger(|l| l.failing_reads.clear());
    }

    /// Make the "user" decline every submission
    pub fn reject_submissions(&self, reject: bool) {
        self.with_ledger(|l| l.reject_submissions = reject);
    }

    /// Make every confirmation come back reverted
    pub fn revert_confirmations(&self, revert: bool) {
        self.with_ledger(|l| l.revert_confirmations = revert);
    }

    pub fn set_read_delay(&self, delay: Option<Duration>) {
        self.with_ledger(|l| l.read_delay = delay);
    }

    pub fn set_confirmation_delay(&self, delay: Option<Duration>) {
        self.with_ledger(|l| l.confirmation_delay = delay);
    }

    // ============ Inspection ============

    pub fn calls(&self) -> Vec<MockCall> {
        self.with_ledger(|l| l.calls.clone())
    }

    pub fn submissions(&self) -> Vec<MockCall> {
        self.calls().into_iter().filter(MockCall::is_submission).collect()
    }

    /// Number of balance reads, i.e. refresh attempts
    pub fn balance_reads(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::ReadBalance(_)))
            .count()
    }

    pub fn clear_calls(&self) {
        self.with_ledger(|l| l.calls.clear());
    }

    pub fn balance_of(&self, owner: Address) -> u128 {
        self.with_ledger(|l| l.balances.get(&owner).copied().unwrap_or(0))
    }

    pub fn shares_of(&self, owner: Address) -> u128 {
        self.with_ledger(|l| l.shares.get(&owner).copied().unwrap_or(0))
    }

    pub fn allowance_of(&self, owner: Address, spender: Address) -> u128 {
        self.with_ledger(|l| l.allowances.get(&(owner, spender)).copied().unwrap_or(0))
    }

    // ============ Internals ============

    fn record(&self, call: MockCall) {
        self.with_ledger(|l| l.calls.push(call));
    }

    async fn read_pause(&self) {
        if let Some(delay) = self.with_ledger(|l| l.read_delay) {
            tokio::time::sleep(delay).await;
        }
    }

    fn submit(&self, call: MockCall, tx: impl FnOnce(Address) -> PendingTx) -> SiaduanResult<TxHash> {
        self.record(call);
        let from = self.signer.ok_or_else(|| SiaduanError::Signing {
            reason: "no signing identity bound".into(),
        })?;
        self.with_ledger(|l| l.queue(tx(from)))
    }
}

impl ProtocolChain for MockChain {
    fn signer(&self) -> Option<Address> {
        self.signer
    }

    fn vault(&self) -> Address {
        Self::VAULT
    }

    async fn read_balance(&self, owner: Address) -> SiaduanResult<u128> {
        self.record(MockCall::ReadBalance(owner));
        self.read_pause().await;
        self.with_ledger(|l| {
            l.check_read(MockRead::Balance)?;
            Ok(l.balances.get(&owner).copied().unwrap_or(0))
        })
    }

    async fn read_allowance(&self, owner: Address, spender: Address) -> SiaduanResult<u128> {
        self.record(MockCall::ReadAllowance { owner, spender });
        self.with_ledger(|l| {
            l.check_read(MockRead::Allowance)?;
            Ok(l.allowances.get(&(owner, spender)).copied().unwrap_or(0))
        })
    }

    async fn read_vault_state(&self, owner: Address) -> SiaduanResult<VaultPosition> {
        self.record(MockCall::ReadShares(owner));
        self.record(MockCall::ReadSharePrice);
        self.record(MockCall::ReadAllocations);
        self.read_pause().await;
        self.with_ledger(|l| {
            l.check_read(MockRead::Shares)?;
            l.check_read(MockRead::SharePrice)?;
            l.check_read(MockRead::Allocations)?;
            Ok(VaultPosition {
                shares: l.shares.get(&owner).copied().unwrap_or(0),
                share_price: l.share_price(),
                allocation: l.allocation,
            })
        })
    }

    async fn read_rates(&self) -> SiaduanResult<PoolRates> {
        self.record(MockCall::ReadRates);
        self.read_pause().await;
        self.with_ledger(|l| {
            l.check_read(MockRead::Rates)?;
            Ok(l.rates)
        })
    }

    async fn read_protocol_details(&self) -> SiaduanResult<ProtocolDetails> {
        self.record(MockCall::ReadDetails);
        self.with_ledger(|l| {
            l.check_read(MockRead::Details)?;
            Ok(ProtocolDetails {
                total_shares: l.total_shares,
                total_assets: l.total_assets(),
                rebalance_threshold: 100,
                last_rate_update: l.last_rate_update,
                pools: vec![
                    PoolInfo {
                        address: Self::POOL_A,
                        name: "Pool A".into(),
                        supply_rate: l.rates.rate_a as u128,
                        total_deposits: l.allocation.pool_a,
                    },
                    PoolInfo {
                        address: Self::POOL_B,
                        name: "Pool B".into(),
                        supply_rate: l.rates.rate_b as u128,
                        total_deposits: l.allocation.pool_b,
                    },
                ],
            })
        })
    }

    async fn submit_mint(&self, amount: u128) -> SiaduanResult<TxHash> {
        self.submit(MockCall::Mint(amount), |to| PendingTx::Mint { to, amount })
    }

    async fn submit_approve(&self, spender: Address, amount: ApprovalAmount) -> SiaduanResult<TxHash> {
        let value = match amount {
            ApprovalAmount::Exact(v) => v,
            ApprovalAmount::Unlimited => u128::MAX,
        };
        self.submit(MockCall::Approve { spender, amount }, |owner| PendingTx::Approve {
            owner,
            spender,
            amount: value,
        })
    }

    async fn submit_deposit(&self, amount: u128) -> SiaduanResult<TxHash> {
        self.submit(MockCall::Deposit(amount), |owner| PendingTx::Deposit { owner, amount })
    }

    async fn submit_withdraw(&self, shares: u128) -> SiaduanResult<TxHash> {
        self.submit(MockCall::Withdraw(shares), |owner| PendingTx::Withdraw { owner, shares })
    }

    async fn submit_report_rates(&self, rate_a: u64, rate_b: u64) -> SiaduanResult<TxHash> {
        self.submit(MockCall::ReportRates { rate_a, rate_b }, |_| PendingTx::ReportRates {
            rate_a,
            rate_b,
        })
    }

    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> SiaduanResult<TxReceipt> {
        self.record(MockCall::Wait(tx_hash));
        if let Some(delay) = self.with_ledger(|l| l.confirmation_delay) {
            tokio::time::sleep(delay).await;
        }
        self.with_ledger(|l| {
            let tx = l
                .pending
                .remove(&tx_hash)
                .ok_or_else(|| SiaduanError::chain(format!("unknown transaction {tx_hash}")))?;
            l.block += 1;
            if l.revert_confirmations {
                return Err(SiaduanError::chain(format!("transaction {tx_hash} reverted")));
            }
            l.apply(tx)?;
            Ok(TxReceipt {
                tx_hash,
                block_number: l.block,
                gas_used: MOCK_GAS_USED,
            })
        })
    }
}

/// Wallet connector handing out [`MockChain`] sessions
pub struct MockConnector {
    chain: MockChain,
    account: Address,
    chain_id: u64,
    expected_chain_id: u64,
    failure: Mutex<Option<SiaduanError>>,
}

impl MockConnector {
    pub fn new(chain: MockChain, account: Address, chain_id: u64, expected_chain_id: u64) -> Self {
        Self {
            chain,
            account,
            chain_id,
            expected_chain_id,
            failure: Mutex::new(None),
        }
    }

    /// Make the next connections fail with `error`
    pub fn fail_with(&self, error: Option<SiaduanError>) {
        *self.failure.lock() = error;
    }
}

impl WalletConnector for MockConnector {
    type Chain = MockChain;

    async fn connect(&self) -> SiaduanResult<WalletSession<MockChain>> {
        let failure = self.failure.lock().clone();
        if let Some(error) = failure {
            return Err(error);
        }
        let signer = (self.chain_id == self.expected_chain_id).then_some(self.account);
        Ok(WalletSession {
            account: self.account,
            chain_id: self.chain_id,
            client: self.chain.with_signer(signer),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: Address = Address([0x42; 20]);

    #[tokio::test]
    async fn test_deposit_needs_confirmed_allowance() {
        let chain = MockChain::new().with_signer(Some(USER));
        chain.set_balance(USER, 1_000_000_000);

        let tx = chain.submit_deposit(100_000_000).await.unwrap();
        let err = chain.wait_for_confirmation(tx).await.unwrap_err();
        assert_eq!(err, SiaduanError::chain("execution reverted: ERC20: insufficient allowance"));

        let approve = chain
            .submit_approve(MockChain::VAULT, ApprovalAmount::Unlimited)
            .await
            .unwrap();
        chain.wait_for_confirmation(approve).await.unwrap();
        let tx = chain.submit_deposit(100_000_000).await.unwrap();
        chain.wait_for_confirmation(tx).await.unwrap();

        assert_eq!(chain.balance_of(USER), 900_000_000);
        assert_eq!(chain.shares_of(USER), 100_000_000);
        assert_eq!(chain.allowance_of(USER, MockChain::VAULT), u128::MAX);
    }

    #[tokio::test]
    async fn test_withdraw_at_higher_share_price() {
        let chain = MockChain::new().with_signer(Some(USER));
        chain.seed_position(USER, PoolAllocation { pool_a: 60, pool_b: 30, idle: 10 });
        chain.accrue_yield(100); // assets 200, shares 100

        let tx = chain.submit_withdraw(50).await.unwrap();
        chain.wait_for_confirmation(tx).await.unwrap();

        assert_eq!(chain.balance_of(USER), 100);
        assert_eq!(chain.shares_of(USER), 50);
        let state = chain.read_vault_state(USER).await.unwrap();
        assert_eq!(state.allocation.total(), 100);
        assert_eq!(state.share_price, 2 * PRICE_ONE);
    }

    #[tokio::test]
    async fn test_submission_without_signer() {
        let chain = MockChain::new();
        let err = chain.submit_mint(1).await.unwrap_err();
        assert!(matches!(err, SiaduanError::Signing { .. }));
    }

    #[tokio::test]
    async fn test_connector_wrong_network_drops_signer() {
        let connector = MockConnector::new(MockChain::new(), USER, 1, 11_155_111);
        let session = connector.connect().await.unwrap();
        assert_eq!(session.client.signer(), None);
    }
}
