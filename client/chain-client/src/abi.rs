//! Contract ABI encoding
//!
//! Only the slice of the Solidity ABI the dashboard needs: static calls
//! with `address` / `uint256` arguments, `uint256` returns, and the one
//! dynamic `string` return (`poolName()`).

use sha3::{Digest, Keccak256};

use siaduan_common::{Address, SiaduanError, SiaduanResult};

/// Size of one ABI word
pub const WORD: usize = 32;

/// Function signatures of the external contracts
pub mod signatures {
    /// Mock USDC token
    pub mod token {
        pub const MINT: &str = "mint(uint256)";
        pub const BALANCE_OF: &str = "balanceOf(address)";
        pub const APPROVE: &str = "approve(address,uint256)";
        pub const ALLOWANCE: &str = "allowance(address,address)";
    }

    /// Lending vault
    pub mod vault {
        pub const DEPOSIT: &str = "deposit(uint256)";
        pub const WITHDRAW: &str = "withdraw(uint256)";
        pub const SHARES: &str = "shares(address)";
        pub const GET_SHARE_PRICE: &str = "getSharePrice()";
        pub const GET_ALLOCATIONS: &str = "getAllocations()";
        pub const TOTAL_SHARES: &str = "totalShares()";
        pub const GET_TOTAL_ASSETS: &str = "getTotalAssets()";
        pub const REBALANCE_THRESHOLD: &str = "rebalanceThreshold()";
    }

    /// Rate coordinator
    pub mod coordinator {
        pub const REPORT_RATES: &str = "reportRates(uint256,uint256)";
        pub const RATE_A: &str = "rateA()";
        pub const RATE_B: &str = "rateB()";
        pub const LAST_UPDATE: &str = "lastUpdate()";
    }

    /// Mock lending pool
    pub mod pool {
        pub const POOL_NAME: &str = "poolName()";
        pub const GET_SUPPLY_RATE: &str = "getSupplyRate(address)";
        pub const GET_TOTAL_DEPOSITS: &str = "getTotalDeposits(address)";
    }
}

/// A static ABI argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// `address`, left-padded to 32 bytes
    Address(Address),
    /// `uint256` holding a value that fits 128 bits
    Uint(u128),
    /// `uint256` max (2^256 - 1)
    MaxUint,
}

impl Token {
    fn encode(&self) -> [u8; WORD] {
        let mut word = [0u8; WORD];
        match self {
            Token::Address(addr) => word[12..].copy_from_slice(addr.as_bytes()),
            Token::Uint(value) => word[16..].copy_from_slice(&value.to_be_bytes()),
            Token::MaxUint => word = [0xff; WORD],
        }
        word
    }
}

/// First four bytes of keccak256(signature)
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for `signature` with static arguments
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * WORD);
    data.extend_from_slice(&selector(signature));
    for arg in args {
        data.extend_from_slice(&arg.encode());
    }
    data
}

fn word<'a>(data: &'a [u8], index: usize, what: &'static str) -> SiaduanResult<&'a [u8]> {
    index
        .checked_mul(WORD)
        .and_then(|start| data.get(start..start.checked_add(WORD)?))
        .ok_or_else(|| SiaduanError::Decode {
            what,
            reason: format!("return data has {} bytes, need word {}", data.len(), index),
        })
}

/// Decode word `index` as a `uint256` that must fit 128 bits
pub fn decode_uint(data: &[u8], index: usize, what: &'static str) -> SiaduanResult<u128> {
    let w = word(data, index, what)?;
    if w[..16].iter().any(|b| *b != 0) {
        return Err(SiaduanError::Decode {
            what,
            reason: "value exceeds 128 bits".into(),
        });
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&w[16..]);
    Ok(u128::from_be_bytes(low))
}

/// Decode word `index` as a `uint256`, clamping anything above 128 bits
///
/// Used for allowances, where an unlimited approval is 2^256 - 1.
pub fn decode_uint_saturating(data: &[u8], index: usize, what: &'static str) -> SiaduanResult<u128> {
    let w = word(data, index, what)?;
    if w[..16].iter().any(|b| *b != 0) {
        return Ok(u128::MAX);
    }
    decode_uint(data, index, what)
}

/// Decode word `index` as a `uint256` that must fit 64 bits
pub fn decode_u64(data: &[u8], index: usize, what: &'static str) -> SiaduanResult<u64> {
    let value = decode_uint(data, index, what)?;
    u64::try_from(value).map_err(|_| SiaduanError::Decode {
        what,
        reason: "value exceeds 64 bits".into(),
    })
}

/// Offsets and lengths inside return data come from the node and are
/// bounds-checked before use
fn decode_len(data: &[u8], index: usize, what: &'static str) -> SiaduanResult<usize> {
    usize::try_from(decode_uint(data, index, what)?).map_err(|_| SiaduanError::Decode {
        what,
        reason: "offset or length exceeds address space".into(),
    })
}

/// Decode a single dynamic `string` return value
pub fn decode_string(data: &[u8], what: &'static str) -> SiaduanResult<String> {
    let offset = decode_len(data, 0, what)?;
    if offset % WORD != 0 {
        return Err(SiaduanError::Decode { what, reason: "misaligned offset".into() });
    }
    let len = decode_len(data, offset / WORD, what)?;
    let bytes = offset
        .checked_add(WORD)
        .and_then(|start| data.get(start..start.checked_add(len)?))
        .ok_or_else(|| SiaduanError::Decode {
            what,
            reason: "string data truncated".into(),
        })?;
    String::from_utf8(bytes.to_vec()).map_err(|e| SiaduanError::Decode {
        what,
        reason: e.to_string(),
    })
}
