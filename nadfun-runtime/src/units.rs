//! Conversions between caller-facing decimal strings and on-chain minor
//! units (18 decimals for MON and every launched token).

use std::str::FromStr;

use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;

use crate::error::TradingError;

pub const DECIMALS: u32 = 18;

/// Parse a positive decimal amount in whole units into minor units.
///
/// Rejects empty, negative, zero, non-numeric and over-precise input.
pub fn parse_amount(raw: &str) -> Result<U256, TradingError> {
    let trimmed = raw.trim();
    let value = Decimal::from_str(trimmed)
        .map_err(|_| TradingError::InvalidAmount(format!("'{raw}' is not a decimal number")))?;
    if value <= Decimal::ZERO {
        return Err(TradingError::InvalidAmount(format!(
            "'{raw}' must be greater than zero"
        )));
    }
    if value.scale() > DECIMALS {
        return Err(TradingError::InvalidAmount(format!(
            "'{raw}' has more than {DECIMALS} decimal places"
        )));
    }
    decimal_to_u256(&value)
}

/// Convert a non-negative `Decimal` of whole units into minor units.
fn decimal_to_u256(d: &Decimal) -> Result<U256, TradingError> {
    if d.is_sign_negative() {
        return Err(TradingError::InvalidAmount(
            "cannot convert a negative amount".into(),
        ));
    }
    let scale = d.scale().min(DECIMALS);
    let mantissa = u128::try_from(d.mantissa())
        .map_err(|e| TradingError::InvalidAmount(format!("amount out of range: {e}")))?;
    let factor = U256::from(10u64).pow(U256::from(DECIMALS - scale));
    Ok(U256::from(mantissa) * factor)
}

/// Parse an amount reported by the indexer.
///
/// Integer strings are already minor units; strings with a fractional part
/// are whole units.
pub fn parse_indexer_amount(raw: &str) -> Result<U256, TradingError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(U256::ZERO);
    }
    if let Ok(v) = U256::from_str_radix(trimmed, 10) {
        return Ok(v);
    }
    let value = Decimal::from_str(trimmed).map_err(|_| {
        TradingError::MarketDataUnavailable(format!("unparseable amount '{raw}'"))
    })?;
    decimal_to_u256(&value.trunc_with_scale(DECIMALS))
        .map_err(|e| TradingError::MarketDataUnavailable(e.to_string()))
}

/// Render minor units as a whole-unit decimal string, trailing zeros
/// removed.
pub fn format_amount(v: U256) -> String {
    let s = format_ether(v);
    match s.split_once('.') {
        Some((whole, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                whole.to_string()
            } else {
                format!("{whole}.{frac}")
            }
        }
        None => s,
    }
}

pub fn parse_address(raw: &str) -> Result<Address, TradingError> {
    raw.trim()
        .parse()
        .map_err(|e| TradingError::InvalidArgument(format!("invalid address '{raw}': {e}")))
}
