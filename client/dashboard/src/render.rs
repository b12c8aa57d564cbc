//! Plain-text panels

use std::fmt::Write;

use siaduan_action_executor::{ActionFailure, ActionOutcome, PendingAction};
use siaduan_common::constants::{shares, token};
use siaduan_common::{
    bps_to_percent, format_units, format_units_short, shares_to_assets, ActionSlot, ChainConfig,
    ConnectionState, ProtocolDetails, ProtocolSnapshot, TxHash,
};

/// Fraction digits shown for token and share amounts
const AMOUNT_DIGITS: u8 = 4;

/// Token amount with up to four fraction digits
pub fn token_amount(value: u128) -> String {
    format_units_short(value, token::DECIMALS, AMOUNT_DIGITS)
}

/// Share price with exactly four fraction digits (`1.0000`)
pub fn share_price(price: u128) -> String {
    let full = format_units(price, shares::PRICE_DECIMALS);
    match full.split_once('.') {
        Some((whole, fraction)) => format!("{whole}.{}", &fraction[..AMOUNT_DIGITS as usize]),
        None => full,
    }
}

/// Transaction hash plus explorer link when the network has one
pub fn tx_line(tx_hash: &TxHash, chain: &ChainConfig) -> String {
    match chain.tx_url(tx_hash) {
        Some(url) => format!("{tx_hash} ({url})"),
        None => tx_hash.to_string(),
    }
}

/// Wallet, faucet, vault, allocation and rate panels
pub fn status(connection: &ConnectionState, snapshot: &ProtocolSnapshot, chain: &ChainConfig) -> String {
    let mut out = String::new();
    let Some(account) = connection.wallet_address.filter(|_| connection.is_connected) else {
        return "wallet   not connected (type `connect`)".to_string();
    };

    let _ = writeln!(out, "wallet   {} on chain {}", account.short(), connection.chain_id);
    if connection.is_wrong_network(chain.chain_id) {
        let _ = writeln!(
            out,
            "         wrong network: switch to {} ({}); transactions are disabled",
            chain.name, chain.chain_id
        );
    }
    if snapshot.is_empty() {
        out.push_str("         no protocol data yet");
        return out;
    }

    let value = shares_to_assets(snapshot.user_shares, snapshot.share_price)
        .map(token_amount)
        .unwrap_or_else(|_| "?".into());
    let _ = writeln!(out, "faucet   {} {}", token_amount(snapshot.token_balance), token::SYMBOL);
    let _ = writeln!(
        out,
        "vault    {} shares @ {} {} (~{} {})",
        token_amount(snapshot.user_shares),
        share_price(snapshot.share_price),
        token::SYMBOL,
        value,
        token::SYMBOL,
    );
    let alloc = &snapshot.allocation;
    let _ = writeln!(
        out,
        "pools    A {} | B {} | idle {}",
        token_amount(alloc.pool_a),
        token_amount(alloc.pool_b),
        token_amount(alloc.idle),
    );
    let _ = write!(
        out,
        "rates    A {} bps ({}) | B {} bps ({})",
        snapshot.rates.rate_a,
        bps_to_percent(snapshot.rates.rate_a),
        snapshot.rates.rate_b,
        bps_to_percent(snapshot.rates.rate_b),
    );
    out
}

/// Vault totals and per-pool details
pub fn details(details: &ProtocolDetails) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "vault    {} {} in {} shares",
        token_amount(details.total_assets),
        token::SYMBOL,
        token_amount(details.total_shares)
    );
    let _ = writeln!(out, "         rebalance threshold {} bps", details.rebalance_threshold);
    let _ = write!(out, "         rates last reported at unix {}", details.last_rate_update);
    for pool in &details.pools {
        let _ = write!(
            out,
            "\n{:<8} {} | supply rate {} | deposits {} {}",
            pool.name,
            pool.address.short(),
            pool.supply_rate,
            token_amount(pool.total_deposits),
            token::SYMBOL,
        );
    }
    out
}

pub fn outcome(outcome: &ActionOutcome, chain: &ChainConfig) -> String {
    let mut out = format!(
        "{} confirmed in block {}\n  tx {}",
        outcome.kind,
        outcome.receipt.block_number,
        tx_line(&outcome.receipt.tx_hash, chain)
    );
    if let Some(approval) = &outcome.approval {
        let _ = write!(out, "\n  approval {}", tx_line(&approval.tx_hash, chain));
    }
    if outcome.snapshot.is_none() {
        out.push_str("\n  (balances will update on the next refresh)");
    }
    out
}

pub fn failure(failure: &ActionFailure) -> String {
    format!("{failure} [{}]", failure.code())
}

/// One line per slot
pub fn slot(slot: ActionSlot, pending: &PendingAction, chain: &ChainConfig) -> String {
    let mut out = format!("{:<7}  {}", slot.to_string(), pending.status);
    if let Some(kind) = pending.kind {
        let _ = write!(out, " ({kind})");
    }
    if let Some(tx_hash) = &pending.tx_hash {
        let _ = write!(out, " {}", tx_line(tx_hash, chain));
    }
    if let Some(error) = &pending.error {
        let _ = write!(out, ": {error}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use siaduan_common::{Address, PoolAllocation, PoolRates};

    fn chain() -> ChainConfig {
        ChainConfig {
            chain_id: 11_155_111,
            name: "Sepolia".into(),
            rpc_url: String::new(),
            explorer_url: "https://sepolia.etherscan.io".into(),
        }
    }

    fn snapshot() -> ProtocolSnapshot {
        ProtocolSnapshot {
            token_balance: 900_000_000,
            user_shares: 100_000_000,
            share_price: 1_050_000_000_000_000_000,
            allocation: PoolAllocation { pool_a: 60_000_000, pool_b: 30_000_000, idle: 15_000_000 },
            rates: PoolRates { rate_a: 300, rate_b: 800 },
            as_of: 1,
        }
    }

    #[test]
    fn test_share_price_four_digits() {
        assert_eq!(share_price(1_000_000_000_000_000_000), "1.0000");
        assert_eq!(share_price(1_234_567_000_000_000_000), "1.2345");
    }

    #[test]
    fn test_status_panels() {
        let account = Address([0x42; 20]);
        let connection = ConnectionState::connected(account, 11_155_111, Some(account), 11_155_111);
        let text = status(&connection, &snapshot(), &chain());

        assert!(text.contains("faucet   900 mUSDC"));
        assert!(text.contains("100 shares @ 1.0500 mUSDC (~105 mUSDC)"));
        assert!(text.contains("pools    A 60 | B 30 | idle 15"));
        assert!(text.contains("A 300 bps (3.00%) | B 800 bps (8.00%)"));
        assert!(!text.contains("wrong network"));
    }

    #[test]
    fn test_status_flags_wrong_network() {
        let account = Address([0x42; 20]);
        let connection = ConnectionState::connected(account, 1, Some(account), 11_155_111);
        let text = status(&connection, &ProtocolSnapshot::default(), &chain());
        assert!(text.contains("wrong network: switch to Sepolia (11155111)"));
        assert!(text.contains("no protocol data yet"));
    }

    #[test]
    fn test_status_disconnected() {
        let text = status(&ConnectionState::disconnected(), &snapshot(), &chain());
        assert!(text.starts_with("wallet   not connected"));
    }

    #[test]
    fn test_tx_line_links_explorer() {
        let hash = TxHash([0xab; 32]);
        let line = tx_line(&hash, &chain());
        assert!(line.ends_with(&format!("(https://sepolia.etherscan.io/tx/{hash})")));

        let local = ChainConfig { explorer_url: String::new(), ..chain() };
        assert_eq!(tx_line(&hash, &local), hash.to_string());
    }
}
