//! Fixed-Point Utilities
//!
//! Token amounts travel as unsigned integers in base units. These helpers
//! convert between user-entered decimal strings and base units, and render
//! base units back for display.

use crate::constants::{rates, shares};
use crate::errors::{SiaduanError, SiaduanResult};

/// Largest supported scale; 10^38 is the last power of ten below u128::MAX
const MAX_DECIMALS: u8 = 38;

/// 10^decimals
pub fn pow10(decimals: u8) -> SiaduanResult<u128> {
    if decimals > MAX_DECIMALS {
        return Err(SiaduanError::InvalidInput {
            param: "decimals",
            reason: "scale too large",
        });
    }
    Ok(10u128.pow(decimals as u32))
}

/// Parse a decimal string into base units
///
/// `"1000"` at 6 decimals is `1_000_000_000`; `"0.5"` is `500_000`.
/// More fractional digits than `decimals` is an error, not a silent
/// truncation.
///
/// # Arguments
/// * `value` - Decimal string, optionally with a single `.`
/// * `decimals` - Number of decimals of the target unit
pub fn parse_units(value: &str, decimals: u8) -> SiaduanResult<u128> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SiaduanError::InvalidAmount { reason: "empty amount" });
    }

    let (whole, fraction) = match value.split_once('.') {
        Some((w, f)) => (w, f),
        None => (value, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(SiaduanError::InvalidAmount { reason: "not a number" });
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SiaduanError::InvalidAmount { reason: "not a number" });
    }
    if fraction.len() > decimals as usize {
        return Err(SiaduanError::InvalidAmount { reason: "too many decimal places" });
    }

    let scale = pow10(decimals)?;
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u128>()
            .map_err(|_| SiaduanError::InvalidAmount { reason: "too large" })?
    };

    let fraction_units = if fraction.is_empty() {
        0
    } else {
        let padding = pow10(decimals - fraction.len() as u8)?;
        fraction
            .parse::<u128>()
            .map_err(|_| SiaduanError::InvalidAmount { reason: "not a number" })?
            * padding
    };

    whole_units
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction_units))
        .ok_or(SiaduanError::InvalidAmount { reason: "too large" })
}

/// Render base units with exactly `decimals` fractional digits
///
/// `900_000_000` at 6 decimals is `"900.000000"`.
pub fn format_units(value: u128, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let digits = format!("{:0>width$}", value, width = decimals as usize + 1);
    let split = digits.len() - decimals as usize;
    format!("{}.{}", &digits[..split], &digits[split..])
}

/// Render base units rounded down to at most `max_fraction` digits,
/// without trailing zeros (`1234.5`, `7`)
pub fn format_units_short(value: u128, decimals: u8, max_fraction: u8) -> String {
    let full = format_units(value, decimals);
    let Some((whole, fraction)) = full.split_once('.') else {
        return full;
    };
    let keep = fraction.len().min(max_fraction as usize);
    let fraction = fraction[..keep].trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Basis points as a percentage string (`300` → `"3.00%"`)
pub fn bps_to_percent(bps: u64) -> String {
    let per_percent = rates::BPS_DENOMINATOR / 100;
    format!("{}.{:02}%", bps / per_percent, bps % per_percent)
}

/// Check a rate against the range the rate controls offer
pub fn validate_rate_bps(bps: u64) -> SiaduanResult<u64> {
    if !(rates::MIN_RATE_BPS..=rates::MAX_RATE_BPS).contains(&bps) {
        return Err(SiaduanError::InvalidInput {
            param: "rate",
            reason: "outside 0-2000 bps",
        });
    }
    Ok(bps)
}

/// Token value of a share amount at a given share price
///
/// value = shares * share_price / 1e18, rounded down.
pub fn shares_to_assets(share_amount: u128, share_price: u128) -> SiaduanResult<u128> {
    let value = share_amount
        .checked_mul(share_price)
        .ok_or(SiaduanError::InvalidAmount { reason: "too large" })?;
    Ok(value / shares::PRICE_ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::token;

    #[test]
    fn test_parse_whole_amount() {
        assert_eq!(parse_units("1000", token::DECIMALS).unwrap(), 1_000_000_000);
        assert_eq!(parse_units(" 100 ", token::DECIMALS).unwrap(), 100_000_000);
    }

    #[test]
    fn test_parse_fractional_amount() {
        assert_eq!(parse_units("0.5", 6).unwrap(), 500_000);
        assert_eq!(parse_units(".25", 6).unwrap(), 250_000);
        assert_eq!(parse_units("12.", 6).unwrap(), 12_000_000);
        assert_eq!(parse_units("1.000001", 6).unwrap(), 1_000_001);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_units("", 6).is_err());
        assert!(parse_units(".", 6).is_err());
        assert!(parse_units("-1", 6).is_err());
        assert!(parse_units("1e6", 6).is_err());
        assert!(parse_units("1.0000001", 6).is_err());
        assert!(parse_units("1.2.3", 6).is_err());
    }

    #[test]
    fn test_format_full_precision() {
        assert_eq!(format_units(900_000_000, 6), "900.000000");
        assert_eq!(format_units(1, 6), "0.000001");
        assert_eq!(format_units(0, 6), "0.000000");
        assert_eq!(format_units(1_000_000_000_000_000_000, 18), "1.000000000000000000");
        assert_eq!(format_units(42, 0), "42");
    }

    #[test]
    fn test_format_short() {
        assert_eq!(format_units_short(1_234_500_000, 6, 4), "1234.5");
        assert_eq!(format_units_short(7_000_000, 6, 4), "7");
        assert_eq!(format_units_short(1_000_123_456_000_000_000, 18, 4), "1.0001");
    }

    #[test]
    fn test_bps_to_percent() {
        assert_eq!(bps_to_percent(300), "3.00%");
        assert_eq!(bps_to_percent(1800), "18.00%");
        assert_eq!(bps_to_percent(5), "0.05%");
    }

    #[test]
    fn test_rate_bounds() {
        assert!(validate_rate_bps(0).is_ok());
        assert!(validate_rate_bps(2000).is_ok());
        assert!(validate_rate_bps(2001).is_err());
    }

    #[test]
    fn test_shares_to_assets() {
        // 100 shares at 1.05 per share
        let price = 1_050_000_000_000_000_000u128;
        assert_eq!(shares_to_assets(100_000_000, price).unwrap(), 105_000_000);
    }
}
