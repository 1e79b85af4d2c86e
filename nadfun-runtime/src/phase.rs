//! Market phase resolution.
//!
//! A token is in the DEX phase when the indexer reports `market_type = DEX`
//! or flags it as listed. The transition is one-way: once an address has
//! been seen in the DEX phase, later CURVE reports for it are treated as
//! indexer lag and overridden.
//!
//! DEX trading is stricter: it requires the token record's listing flag,
//! whatever the market type says.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use dashmap::DashSet;

use crate::error::TradingError;
use crate::market_data::MarketDataSource;
use crate::types::{MarketPhase, MarketState};
use crate::units::parse_address;

pub struct PhaseResolver {
    market: Arc<dyn MarketDataSource>,
    graduated: DashSet<Address>,
}

impl PhaseResolver {
    pub fn new(market: Arc<dyn MarketDataSource>) -> Self {
        Self {
            market,
            graduated: DashSet::new(),
        }
    }

    /// Fresh market state for `token`, with the phase resolved from the
    /// market record and the listing flag.
    pub async fn resolve_phase(&self, token: &str) -> Result<MarketState, TradingError> {
        let address = parse_address(token)?;
        let (market, info) = futures::join!(
            self.market.token_market(token),
            self.market.token_info(token)
        );
        let market = market?;

        let reported: MarketPhase = market
            .market_type
            .parse()
            .map_err(TradingError::MarketDataUnavailable)?;
        let listed = match info {
            Ok(info) => info.is_listing.unwrap_or(false),
            Err(e) => {
                tracing::warn!(token = %address, error = %e, "Listing flag unavailable, using market type only");
                false
            }
        };

        let phase = self.observe(address, reported, listed);
        market.to_state(address, phase)
    }

    /// Fold one indexer observation into the latch and return the
    /// effective phase.
    pub fn observe(&self, token: Address, reported: MarketPhase, listed: bool) -> MarketPhase {
        if listed || reported == MarketPhase::Dex {
            self.graduated.insert(token);
            return MarketPhase::Dex;
        }
        if self.graduated.contains(&token) {
            tracing::warn!(%token, "Indexer reported CURVE for a graduated token, keeping DEX");
            return MarketPhase::Dex;
        }
        MarketPhase::Curve
    }

    /// Require the listing flag before routing a trade to the DEX. A failed
    /// token lookup is returned rather than read as "not listed".
    pub async fn assert_listed(&self, token: &str) -> Result<(), TradingError> {
        let address = parse_address(token)?;
        let info = self.market.token_info(token).await?;
        if !info.is_listing.unwrap_or(false) {
            return Err(TradingError::WrongPhase {
                actual: MarketPhase::Curve,
                expected: MarketPhase::Dex,
            });
        }
        self.graduated.insert(address);
        Ok(())
    }

    /// Resolve and require `expected`. A mismatch is terminal for the call.
    pub async fn assert_phase(
        &self,
        token: &str,
        expected: MarketPhase,
    ) -> Result<MarketState, TradingError> {
        let state = self.resolve_phase(token).await?;
        if state.phase != expected {
            return Err(TradingError::WrongPhase {
                actual: state.phase,
                expected,
            });
        }
        Ok(state)
    }
}

/// Tokens still purchasable from the curve.
///
/// Approximation: the indexer does not expose the curve's target token
/// figure, so `reserve_native` stands in for the sold amount. Rejection
/// behaviour depends on this exact formula.
pub fn available_supply(state: &MarketState) -> U256 {
    state.reserve_token.saturating_sub(state.reserve_native)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(reserve_token: u64, reserve_native: u64) -> MarketState {
        MarketState {
            token: Address::ZERO,
            phase: MarketPhase::Curve,
            virtual_native: U256::from(1u64),
            virtual_token: U256::from(1u64),
            reserve_token: U256::from(reserve_token),
            reserve_native: U256::from(reserve_native),
            price: "0".into(),
        }
    }

    #[test]
    fn test_available_supply() {
        assert_eq!(available_supply(&state(90_000, 50_000)), U256::from(40_000u64));
        assert_eq!(available_supply(&state(50_000, 50_000)), U256::ZERO);
        assert_eq!(available_supply(&state(10, 50_000)), U256::ZERO);
    }
}
