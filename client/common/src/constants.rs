//! Protocol Constants
//!
//! Fixed scales, bounds and deployment values for the Siaduan dashboard.
//!
//! # Network Configuration
//!
//! Use feature flags to compile for different networks:
//! - Default (no feature) - Sepolia testnet, where the demo contracts live
//! - `devnet` - a local dev chain (anvil / hardhat) on `127.0.0.1:8545`
//!
//! ```toml
//! # For local development:
//! siaduan-common = { path = "...", features = ["devnet"] }
//! ```

/// Mock USDC token metadata
pub mod token {
    /// Token symbol as shown to the user
    pub const SYMBOL: &str = "mUSDC";
    /// Decimal places of the token (USDC style)
    pub const DECIMALS: u8 = 6;
    /// One whole token in base units
    pub const ONE: u128 = 1_000_000;
}

/// Vault share scales
pub mod shares {
    /// Shares use the same scale as the deposited token
    pub const DECIMALS: u8 = 6;
    /// Share price is reported with 18 decimals (1e18 = 1 token per share)
    pub const PRICE_DECIMALS: u8 = 18;
    /// Share price of a fresh vault
    pub const PRICE_ONE: u128 = 1_000_000_000_000_000_000;
}

/// Interest rates (in basis points, 100 = 1%)
pub mod rates {
    /// Lowest rate the rate controls offer
    pub const MIN_RATE_BPS: u64 = 0;
    /// Highest rate the rate controls offer (20%)
    ///
    /// This is a UI convention only; the coordinator contract accepts any
    /// value and the executor submits exactly what it is given.
    pub const MAX_RATE_BPS: u64 = 2_000;
    /// Basis points denominator
    pub const BPS_DENOMINATOR: u64 = 10_000;
    /// Pool A rate proposed by default
    pub const DEFAULT_RATE_A_BPS: u64 = 300;
    /// Pool B rate proposed by default
    pub const DEFAULT_RATE_B_BPS: u64 = 800;
}

/// Faucet defaults
pub mod faucet {
    use super::token::ONE;

    /// Amount pre-filled in the faucet (1,000 mUSDC)
    pub const DEFAULT_MINT_AMOUNT: u128 = 1_000 * ONE;
}

/// Refresh and confirmation timing
pub mod timing {
    /// Background snapshot refresh period while connected
    pub const REFRESH_INTERVAL_SECS: u64 = 10;
    /// Delay between two `eth_getTransactionReceipt` polls
    pub const RECEIPT_POLL_INTERVAL_MS: u64 = 1_000;
    /// Give up waiting for a receipt after this long
    pub const CONFIRMATION_TIMEOUT_SECS: u64 = 120;
}

/// Expected network
///
/// Values differ between Sepolia and a local dev chain.
pub mod network {
    /// Chain id every mutating action is meant for
    /// - Default: Sepolia (11155111)
    /// - Devnet: anvil / hardhat default (31337)
    #[cfg(not(feature = "devnet"))]
    pub const CHAIN_ID: u64 = 11_155_111;
    #[cfg(feature = "devnet")]
    pub const CHAIN_ID: u64 = 31_337;

    /// Human-readable network name
    #[cfg(not(feature = "devnet"))]
    pub const NAME: &str = "Sepolia";
    #[cfg(feature = "devnet")]
    pub const NAME: &str = "Devnet";

    /// Default JSON-RPC endpoint
    #[cfg(not(feature = "devnet"))]
    pub const RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";
    #[cfg(feature = "devnet")]
    pub const RPC_URL: &str = "http://127.0.0.1:8545";

    /// Block explorer base URL (empty when the network has none)
    #[cfg(not(feature = "devnet"))]
    pub const EXPLORER_URL: &str = "https://sepolia.etherscan.io";
    #[cfg(feature = "devnet")]
    pub const EXPLORER_URL: &str = "";
}

/// Deployed contract addresses (Sepolia)
pub mod addresses {
    /// Mock USDC token (mint / balanceOf / approve / allowance)
    pub const MOCK_USDC: &str = "0xf044c58496693c106a7eae5460d39c1e99abe074";
    /// Lending vault (deposit / withdraw / shares / share price / allocations)
    pub const LENDING_VAULT: &str = "0xa968EEB8d2897464E41De673D79f1e289A3B0b7d";
    /// Rate coordinator observed by the automation network
    pub const RATE_COORDINATOR: &str = "0x8d8159e74eE9c987925a2B5b21Cc6D6970513648";
    /// Mock lending pool A
    pub const POOL_A: &str = "0x242f6bcCA3208ff2b81F57Af6B9DC281bf1EabF4";
    /// Mock lending pool B
    pub const POOL_B: &str = "0x7952AD383bC3B3443E36d58eC585C49824E4e489";
}

/// JSON-RPC / EIP-1193 error codes
pub mod rpc_codes {
    /// The user rejected the request
    pub const USER_REJECTED: i64 = 4001;
    /// The requested account or method has not been authorized
    pub const UNAUTHORIZED: i64 = 4100;
    /// Execution reverted (geth / anvil)
    pub const EXECUTION_REVERTED: i64 = 3;
    /// Generic server error used by most nodes for reverts
    pub const SERVER_ERROR: i64 = -32000;
}
