//! Constant-product bonding-curve math.
//!
//! Pure integer arithmetic on minor units. Every division truncates, which
//! rounds in the platform's favour; estimates must reproduce that bias
//! exactly for validity comparisons against on-chain results.

use alloy::primitives::U256;

use crate::error::TradingError;

pub const BPS_DENOMINATOR: u64 = 10_000;

/// Fee charged on top of a curve input amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub fee: U256,
    pub total: U256,
}

fn constant_product(virtual_native: U256, virtual_token: U256) -> Result<U256, TradingError> {
    virtual_native
        .checked_mul(virtual_token)
        .ok_or_else(|| TradingError::Domain("virtual reserve product overflows 256 bits".into()))
}

/// Tokens received for `amount_in` native units.
///
/// `k = vN * vT; vT' = k / (vN + amountIn); out = vT - vT'`
///
/// Fails when `vT'` truncates to zero, so the result is always below `vT`.
pub fn quote_exact_in(
    virtual_native: U256,
    virtual_token: U256,
    amount_in: U256,
) -> Result<U256, TradingError> {
    let k = constant_product(virtual_native, virtual_token)?;
    let new_virtual_native = virtual_native
        .checked_add(amount_in)
        .ok_or_else(|| TradingError::Domain("input amount overflows virtual reserve".into()))?;
    if new_virtual_native.is_zero() {
        return Err(TradingError::Domain("virtual native reserve is zero".into()));
    }
    let new_virtual_token = k / new_virtual_native;
    if new_virtual_token.is_zero() {
        return Err(TradingError::Domain(format!(
            "input {amount_in} would drain the virtual token reserve"
        )));
    }
    Ok(virtual_token - new_virtual_token)
}

/// Native input required to receive exactly `tokens_out`.
///
/// `k / (vT - tokensOut) - vN`; fails when `tokens_out >= vT`.
pub fn amount_in_for_exact_out(
    virtual_native: U256,
    virtual_token: U256,
    tokens_out: U256,
) -> Result<U256, TradingError> {
    if tokens_out >= virtual_token {
        return Err(TradingError::Domain(format!(
            "tokens out {tokens_out} must be below virtual token reserve {virtual_token}"
        )));
    }
    let k = constant_product(virtual_native, virtual_token)?;
    let required = k / (virtual_token - tokens_out);
    Ok(required.saturating_sub(virtual_native))
}

/// `fee = amount * fee_bps / 10000`, `total = amount + fee`.
pub fn with_fee(amount: U256, fee_bps: u32) -> FeeBreakdown {
    let fee = amount.saturating_mul(U256::from(fee_bps)) / U256::from(BPS_DENOMINATOR);
    FeeBreakdown {
        fee,
        total: amount.saturating_add(fee),
    }
}

/// Minimum acceptable output: `expected * (10000 - slippage_bps) / 10000`.
pub fn apply_slippage(expected_out: U256, slippage_bps: u32) -> Result<U256, TradingError> {
    if u64::from(slippage_bps) > BPS_DENOMINATOR {
        return Err(TradingError::InvalidArgument(format!(
            "slippage {slippage_bps} bps exceeds 10000"
        )));
    }
    let factor = U256::from(BPS_DENOMINATOR - u64::from(slippage_bps));
    Ok(expected_out.saturating_mul(factor) / U256::from(BPS_DENOMINATOR))
}

/// Inflate an amount by `buffer_bps` to tolerate price movement between
/// quote and inclusion.
pub fn with_buffer(amount: U256, buffer_bps: u32) -> U256 {
    let factor = U256::from(BPS_DENOMINATOR + u64::from(buffer_bps));
    amount.saturating_mul(factor) / U256::from(BPS_DENOMINATOR)
}
