use alloy::primitives::{Address, U256};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Market phase of a launched token.
///
/// Transitions only CURVE → DEX, when the last curve tokens are bought.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketPhase {
    Curve,
    Dex,
}

impl MarketPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketPhase::Curve => "CURVE",
            MarketPhase::Dex => "DEX",
        }
    }
}

impl std::fmt::Display for MarketPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MarketPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CURVE" => Ok(MarketPhase::Curve),
            "DEX" => Ok(MarketPhase::Dex),
            other => Err(format!("Unknown market type: {other}")),
        }
    }
}

/// Fresh view of a token's market, re-queried before every state-changing
/// decision. All amounts are minor units (wei).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarketState {
    pub token: Address,
    pub phase: MarketPhase,
    pub virtual_native: U256,
    pub virtual_token: U256,
    pub reserve_token: U256,
    pub reserve_native: U256,
    /// Decimal price string as reported by the indexer. Display only.
    pub price: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TradeMode {
    ExactIn,
    ExactOut,
}

/// One trading request, built per tool invocation and never persisted.
#[derive(Debug)]
pub struct TradeIntent {
    pub token_address: String,
    /// Venue the caller targets; checked against the resolved phase.
    pub venue: MarketPhase,
    pub direction: Direction,
    pub mode: TradeMode,
    /// Positive decimal string in whole units (MON for buys, tokens for
    /// sells and exact-out buys).
    pub amount: String,
    pub slippage_bps: Option<u32>,
    pub signer: Identity,
}

/// Outcome of one executed trade.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TradeResult {
    pub tx_hash: String,
    pub succeeded: bool,
    pub estimated_out: Option<U256>,
    /// Position delta observed through the indexer after settlement.
    pub observed_out: Option<U256>,
    /// False when `observed_out` could not be measured and callers should
    /// rely on `estimated_out`.
    pub reconciled: bool,
    /// Native amount sent with the transaction, fee included.
    pub total_value: Option<U256>,
    pub approval_tx_hash: Option<String>,
    /// Set when an exact-out buy consumes the remaining curve supply,
    /// which lists the token on the DEX.
    pub triggers_listing: bool,
    pub message: String,
}

impl TradeResult {
    pub(crate) fn submitted(tx_hash: String) -> Self {
        Self {
            tx_hash,
            succeeded: true,
            estimated_out: None,
            observed_out: None,
            reconciled: false,
            total_value: None,
            approval_tx_hash: None,
            triggers_listing: false,
            message: String::new(),
        }
    }

    /// Best available output figure: observed when reconciled, else the
    /// estimate.
    pub fn effective_out(&self) -> Option<U256> {
        if self.reconciled {
            self.observed_out
        } else {
            self.estimated_out
        }
    }
}

/// Result of a native-token transfer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TransferResult {
    pub tx_hash: String,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_parse() {
        assert_eq!("CURVE".parse::<MarketPhase>().unwrap(), MarketPhase::Curve);
        assert_eq!("dex".parse::<MarketPhase>().unwrap(), MarketPhase::Dex);
        assert!("AMM".parse::<MarketPhase>().is_err());
    }

    #[test]
    fn test_phase_serde() {
        let json = serde_json::to_string(&MarketPhase::Dex).unwrap();
        assert_eq!(json, "\"DEX\"");
    }

    #[test]
    fn test_effective_out_prefers_observed() {
        let mut result = TradeResult::submitted("0x1".into());
        result.estimated_out = Some(U256::from(100u64));
        result.observed_out = Some(U256::from(98u64));
        assert_eq!(result.effective_out(), Some(U256::from(100u64)));
        result.reconciled = true;
        assert_eq!(result.effective_out(), Some(U256::from(98u64)));
    }
}
