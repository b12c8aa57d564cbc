//! Command parsing

use siaduan_common::constants::{faucet, rates, shares, token};
use siaduan_common::{
    parse_units, validate_rate_bps, ActionKind, ActionRequest, ActionSlot, SiaduanError,
    SiaduanResult,
};

/// One line of user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Wallet, balances, allocation and rates
    Status,
    /// Vault totals and pool details (read on demand)
    Details,
    /// Run an action
    Action(ActionRequest),
    /// Fill in the largest deposit / withdrawal the snapshot allows
    Max(ActionKind),
    /// Reset a finished slot
    Ack(ActionSlot),
    Connect,
    Disconnect,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  status                    wallet, balances, allocation, rates
  details                   vault totals and pool details
  mint [amount]             mint test tokens (default 1000)
  deposit <amount>          deposit tokens into the vault
  withdraw <shares>         redeem vault shares
  rates [a_bps b_bps]       report pool rates (0-2000 bps, default 300 800)
  max deposit|withdraw      largest amount available
  ack faucet|vault|rates    clear a finished action
  connect | disconnect
  help | quit";

impl Command {
    /// Parse a line; blank lines yield `None`
    pub fn parse(line: &str) -> SiaduanResult<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("status" | "s", []) => Command::Status,
            ("details", []) => Command::Details,
            ("mint", []) => Command::Action(ActionRequest::Mint {
                amount: faucet::DEFAULT_MINT_AMOUNT,
            }),
            ("mint", [amount]) => Command::Action(ActionRequest::Mint {
                amount: parse_units(amount, token::DECIMALS)?,
            }),
            ("deposit", [amount]) => Command::Action(ActionRequest::Deposit {
                amount: parse_units(amount, token::DECIMALS)?,
            }),
            ("withdraw", [amount]) => Command::Action(ActionRequest::Withdraw {
                shares: parse_units(amount, shares::DECIMALS)?,
            }),
            ("rates", []) => Command::Action(ActionRequest::ReportRates {
                rate_a: rates::DEFAULT_RATE_A_BPS,
                rate_b: rates::DEFAULT_RATE_B_BPS,
            }),
            ("rates", [rate_a, rate_b]) => Command::Action(ActionRequest::ReportRates {
                rate_a: parse_rate(rate_a)?,
                rate_b: parse_rate(rate_b)?,
            }),
            ("max", [kind]) => Command::Max(match kind.to_ascii_lowercase().as_str() {
                "deposit" => ActionKind::Deposit,
                "withdraw" => ActionKind::Withdraw,
                _ => {
                    return Err(SiaduanError::InvalidInput {
                        param: "max",
                        reason: "expected deposit or withdraw",
                    })
                }
            }),
            ("ack", [slot]) => Command::Ack(slot.parse()?),
            ("connect", []) => Command::Connect,
            ("disconnect", []) => Command::Disconnect,
            ("help" | "?", []) => Command::Help,
            ("quit" | "exit" | "q", []) => Command::Quit,
            _ => {
                return Err(SiaduanError::InvalidInput {
                    param: "command",
                    reason: "unknown command or wrong arguments (try `help`)",
                })
            }
        };
        Ok(Some(command))
    }

    /// Commands that send transactions
    pub fn is_mutating(&self) -> bool {
        matches!(self, Command::Action(_))
    }
}

/// Whole basis points within the range the rate controls offer
fn parse_rate(value: &str) -> SiaduanResult<u64> {
    let bps = value.parse().map_err(|_| SiaduanError::InvalidInput {
        param: "rate",
        reason: "expected whole basis points",
    })?;
    validate_rate_bps(bps)
}
