//! Core Types for the Siaduan Dashboard
//!
//! This module defines the data structures shared across the client
//! crates: chain identifiers, the protocol snapshot, the connection state
//! and the vocabulary of user actions.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::SiaduanError;

// ============ Chain Identifiers ============

macro_rules! hex_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr, $what:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(into = "String", try_from = "String")]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Raw bytes
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Returns true for the all-zero value
            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }
        }

        impl FromStr for $name {
            type Err = SiaduanError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s
                    .strip_prefix("0x")
                    .or_else(|| s.strip_prefix("0X"))
                    .unwrap_or(s);
                let bytes = hex::decode(digits).map_err(|e| SiaduanError::Decode {
                    what: $what,
                    reason: e.to_string(),
                })?;
                let bytes: [u8; $len] = bytes.try_into().map_err(|b: Vec<u8>| {
                    SiaduanError::Decode {
                        what: $what,
                        reason: format!("expected {} bytes, got {}", $len, b.len()),
                    }
                })?;
                Ok(Self(bytes))
            }
        }

        impl TryFrom<String> for $name {
            type Error = SiaduanError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }
    };
}

hex_bytes!(
    /// 20-byte EVM account or contract address
    Address,
    20,
    "address"
);

hex_bytes!(
    /// 32-byte transaction hash, also used as the transaction handle
    TxHash,
    32,
    "transaction hash"
);

impl Address {
    /// Shortened form for display (`0x1234…abcd`)
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}…{}", &full[..6], &full[full.len() - 4..])
    }
}

// ============ Protocol Snapshot ============

/// Split of vault assets across the two lending pools and the idle buffer
///
/// All amounts in token base units (6 decimals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolAllocation {
    /// Assets deployed to pool A
    pub pool_a: u128,
    /// Assets deployed to pool B
    pub pool_b: u128,
    /// Assets held by the vault itself
    pub idle: u128,
}

impl PoolAllocation {
    /// Sum of the three components (equals vault total assets on-chain)
    pub fn total(&self) -> u128 {
        self.pool_a
            .saturating_add(self.pool_b)
            .saturating_add(self.idle)
    }
}

/// Rates currently published by the rate coordinator (basis points)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolRates {
    /// Pool A supply rate
    pub rate_a: u64,
    /// Pool B supply rate
    pub rate_b: u64,
}

/// The three vault reads that make up a user's position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VaultPosition {
    /// User's vault shares (6 decimals)
    pub shares: u128,
    /// Share price (18 decimals)
    pub share_price: u128,
    /// Current pool allocation
    pub allocation: PoolAllocation,
}

/// Latest locally-known view of on-chain state
///
/// Replaced as a whole on every successful refresh; never patched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProtocolSnapshot {
    /// Wallet token balance (6 decimals)
    pub token_balance: u128,
    /// Wallet vault shares (6 decimals)
    pub user_shares: u128,
    /// Vault share price (18 decimals)
    pub share_price: u128,
    /// Vault asset allocation
    pub allocation: PoolAllocation,
    /// Published pool rates
    pub rates: PoolRates,
    /// Unix milliseconds of the refresh that produced this snapshot (0 = never)
    pub as_of: u64,
}

impl ProtocolSnapshot {
    /// Builds a snapshot from one complete set of reads
    pub fn from_reads(token_balance: u128, position: VaultPosition, rates: PoolRates, as_of: u64) -> Self {
        Self {
            token_balance,
            user_shares: position.shares,
            share_price: position.share_price,
            allocation: position.allocation,
            rates,
            as_of,
        }
    }

    /// Returns true for the zero snapshot (no refresh has landed yet)
    pub fn is_empty(&self) -> bool {
        self.as_of == 0
    }
}

// ============ Connection State ============

/// Wallet connection as seen by the client
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionState {
    /// Connected wallet account
    pub wallet_address: Option<Address>,
    /// Whether a wallet session is bound
    pub is_connected: bool,
    /// Chain id reported by the wallet (0 when disconnected)
    pub chain_id: u64,
    /// Account able to sign; only present on the expected network
    pub signing_account: Option<Address>,
}

impl ConnectionState {
    /// The zero state
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Connected state; the signing handle is dropped on any other network
    pub fn connected(
        account: Address,
        chain_id: u64,
        signing_account: Option<Address>,
        expected_chain_id: u64,
    ) -> Self {
        Self {
            wallet_address: Some(account),
            is_connected: true,
            chain_id,
            signing_account: signing_account.filter(|_| chain_id == expected_chain_id),
        }
    }

    /// Connected, but to a chain other than the expected one
    pub fn is_wrong_network(&self, expected_chain_id: u64) -> bool {
        self.is_connected && self.chain_id != expected_chain_id
    }

    /// Returns true if transactions can be submitted
    pub fn can_sign(&self) -> bool {
        self.is_connected && self.signing_account.is_some()
    }
}

// ============ Transactions ============

/// Receipt of an included, successful transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Block the transaction was included in
    pub block_number: u64,
    /// Gas consumed
    pub gas_used: u64,
}

/// Allowance value sent with an `approve` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalAmount {
    /// Exactly this many base units
    Exact(u128),
    /// The maximal uint256 value (2^256 - 1)
    Unlimited,
}

// ============ Protocol Details ============

/// Static-ish details of one mock lending pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    /// Pool contract address
    pub address: Address,
    /// Human-readable pool name
    pub name: String,
    /// Supply rate the pool reports for the vault token
    pub supply_rate: u128,
    /// Total deposits of the vault token held by the pool (6 decimals)
    pub total_deposits: u128,
}

/// On-demand protocol details, never polled
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProtocolDetails {
    /// Total vault shares outstanding (6 decimals)
    pub total_shares: u128,
    /// Total vault assets (6 decimals)
    pub total_assets: u128,
    /// Rate difference that triggers a rebalance (basis points)
    pub rebalance_threshold: u128,
    /// Unix seconds of the coordinator's last rate report
    pub last_rate_update: u64,
    /// Pool A and pool B
    pub pools: Vec<PoolInfo>,
}

// ============ Actions ============

/// Kind of user action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Mint test tokens from the faucet
    Mint,
    /// Deposit tokens into the vault
    Deposit,
    /// Redeem vault shares
    Withdraw,
    /// Report pool rates to the coordinator
    ReportRates,
}

impl ActionKind {
    /// The UI slot this kind of action occupies
    pub fn slot(&self) -> ActionSlot {
        match self {
            ActionKind::Mint => ActionSlot::Faucet,
            ActionKind::Deposit | ActionKind::Withdraw => ActionSlot::Vault,
            ActionKind::ReportRates => ActionSlot::Rates,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionKind::Mint => "Mint",
            ActionKind::Deposit => "Deposit",
            ActionKind::Withdraw => "Withdraw",
            ActionKind::ReportRates => "Rate update",
        })
    }
}

/// Logical UI surface an action runs on; one action per slot at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionSlot {
    /// Token faucet (mint)
    Faucet,
    /// Vault card (deposit / withdraw)
    Vault,
    /// Rate control (report rates)
    Rates,
}

impl FromStr for ActionSlot {
    type Err = SiaduanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "faucet" | "mint" => Ok(ActionSlot::Faucet),
            "vault" | "deposit" | "withdraw" => Ok(ActionSlot::Vault),
            "rates" | "rate" => Ok(ActionSlot::Rates),
            _ => Err(SiaduanError::InvalidInput {
                param: "slot",
                reason: "expected faucet, vault or rates",
            }),
        }
    }
}

impl fmt::Display for ActionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionSlot::Faucet => "faucet",
            ActionSlot::Vault => "vault",
            ActionSlot::Rates => "rates",
        })
    }
}

/// Lifecycle of a pending action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionStatus {
    /// Nothing running
    #[default]
    Idle,
    /// Waiting for an allowance approval to confirm
    Approving,
    /// Main transaction being submitted
    Submitting,
    /// Waiting for the main transaction to be included
    Confirming,
    /// Finished successfully
    Done,
    /// Finished with an error
    Failed,
}

impl ActionStatus {
    /// Done or failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionStatus::Done | ActionStatus::Failed)
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionStatus::Idle => "idle",
            ActionStatus::Approving => "approving",
            ActionStatus::Submitting => "submitting",
            ActionStatus::Confirming => "confirming",
            ActionStatus::Done => "done",
            ActionStatus::Failed => "failed",
        })
    }
}

/// A user action with its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionRequest {
    /// Mint `amount` token base units to the signer
    Mint { amount: u128 },
    /// Deposit `amount` token base units into the vault
    Deposit { amount: u128 },
    /// Redeem `shares` vault share units
    Withdraw { shares: u128 },
    /// Report both pool rates in basis points, unscaled
    ReportRates { rate_a: u64, rate_b: u64 },
}

impl ActionRequest {
    /// Kind of this request
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRequest::Mint { .. } => ActionKind::Mint,
            ActionRequest::Deposit { .. } => ActionKind::Deposit,
            ActionRequest::Withdraw { .. } => ActionKind::Withdraw,
            ActionRequest::ReportRates { .. } => ActionKind::ReportRates,
        }
    }

    /// Slot this request occupies
    pub fn slot(&self) -> ActionSlot {
        self.kind().slot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VAULT: &str = "0xa968EEB8d2897464E41De673D79f1e289A3B0b7d";

    #[test]
    fn test_address_parse_and_display() {
        let addr: Address = VAULT.parse().unwrap();
        assert_eq!(addr.to_string(), VAULT.to_lowercase());
        assert_eq!(addr.short(), "0xa968…0b7d");
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert_eq!(err.code(), "E022_DECODE");
    }

    #[test]
    fn test_address_serde_as_hex_string() {
        let addr: Address = VAULT.parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", VAULT.to_lowercase()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_signing_handle_requires_expected_network() {
        let account = Address([7u8; 20]);

        let good = ConnectionState::connected(account, 11_155_111, Some(account), 11_155_111);
        assert!(good.can_sign());
        assert!(!good.is_wrong_network(11_155_111));

        let wrong = ConnectionState::connected(account, 1, Some(account), 11_155_111);
        assert!(wrong.is_connected);
        assert!(!wrong.can_sign());
        assert!(wrong.is_wrong_network(11_155_111));
    }

    #[test]
    fn test_action_slots() {
        assert_eq!(ActionRequest::Mint { amount: 1 }.slot(), ActionSlot::Faucet);
        assert_eq!(ActionRequest::Deposit { amount: 1 }.slot(), ActionSlot::Vault);
        assert_eq!(ActionRequest::Withdraw { shares: 1 }.slot(), ActionSlot::Vault);
        assert_eq!(
            ActionRequest::ReportRates { rate_a: 1, rate_b: 2 }.slot(),
            ActionSlot::Rates
        );
        assert_eq!("deposit".parse::<ActionSlot>().unwrap(), ActionSlot::Vault);
    }

    #[test]
    fn test_status_classification() {
        assert!(!ActionStatus::Idle.is_terminal());
        assert!(ActionStatus::Done.is_terminal());
        assert!(ActionStatus::Failed.is_terminal());
        assert!(!ActionStatus::Submitting.is_terminal());
    }

    #[test]
    fn test_allocation_total() {
        let alloc = PoolAllocation { pool_a: 10, pool_b: 20, idle: 5 };
        assert_eq!(alloc.total(), 35);
    }
}
