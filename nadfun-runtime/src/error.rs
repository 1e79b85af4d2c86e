use thiserror::Error;

use crate::types::MarketPhase;

#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Wrong market phase: token is in {actual} phase, operation requires {expected}")]
    WrongPhase {
        actual: MarketPhase,
        expected: MarketPhase,
    },

    #[error("Bonding curve sold out: no tokens left to buy")]
    SoldOut,

    #[error("Requested {requested} tokens exceeds available supply {available}")]
    ExceedsAvailableSupply { requested: String, available: String },

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: String, need: String },

    #[error("Transaction reverted: {tx_hash}")]
    TransactionReverted { tx_hash: String },

    #[error("Approval failed: {0}")]
    ApprovalFailed(String),

    #[error("No signing identity: authenticate a session with a wallet or supply a private key")]
    NoIdentity,

    #[error("Curve math domain error: {0}")]
    Domain(String),

    #[error("Market data unavailable: {0}")]
    MarketDataUnavailable(String),

    #[error("Chain error: {0}")]
    Chain(String),

    #[error("Receipt not observed for {tx_hash}; outcome unknown, check the transaction separately")]
    ReceiptTimeout { tx_hash: String },

    #[error("Session store error: {0}")]
    SessionStore(String),

    #[error("Wallet provider error: {0}")]
    WalletProvider(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),
}

/// Coarse classification used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed caller input; never reaches the chain or the store.
    InputValidation,
    /// Market state rejected the operation after a fresh read.
    StatePrecondition,
    /// A collaborator (indexer, node, store, wallet provider) failed.
    ExternalDependency,
    /// The transaction was broadcast and its outcome is terminal.
    TransactionOutcome,
    Configuration,
}

impl TradingError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TradingError::InvalidAmount(_)
            | TradingError::InvalidArgument(_)
            | TradingError::NoIdentity
            | TradingError::Domain(_) => ErrorCategory::InputValidation,
            TradingError::WrongPhase { .. }
            | TradingError::SoldOut
            | TradingError::ExceedsAvailableSupply { .. } => ErrorCategory::StatePrecondition,
            TradingError::InsufficientBalance { .. }
            | TradingError::TransactionReverted { .. }
            | TradingError::ApprovalFailed(_) => ErrorCategory::TransactionOutcome,
            TradingError::MarketDataUnavailable(_)
            | TradingError::Chain(_)
            | TradingError::ReceiptTimeout { .. }
            | TradingError::SessionStore(_)
            | TradingError::WalletProvider(_)
            | TradingError::HttpError(_)
            | TradingError::SerializationError(_) => ErrorCategory::ExternalDependency,
            TradingError::ConfigError(_) => ErrorCategory::Configuration,
        }
    }

    /// Whether the caller may reasonably retry the same call.
    ///
    /// A receipt timeout is excluded: the transaction may still land, and
    /// resubmitting could execute the trade twice.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::ExternalDependency
            && !matches!(self, TradingError::ReceiptTimeout { .. })
    }
}

impl From<reqwest::Error> for TradingError {
    fn from(e: reqwest::Error) -> Self {
        TradingError::HttpError(e.to_string())
    }
}

impl From<serde_json::Error> for TradingError {
    fn from(e: serde_json::Error) -> Self {
        TradingError::SerializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            TradingError::InvalidAmount("x".into()).category(),
            ErrorCategory::InputValidation
        );
        assert_eq!(
            TradingError::WrongPhase {
                actual: MarketPhase::Curve,
                expected: MarketPhase::Dex
            }
            .category(),
            ErrorCategory::StatePrecondition
        );
        assert_eq!(
            TradingError::TransactionReverted {
                tx_hash: "0x1".into()
            }
            .category(),
            ErrorCategory::TransactionOutcome
        );
    }

    #[test]
    fn test_retryable() {
        assert!(TradingError::Chain("rpc down".into()).is_retryable());
        assert!(TradingError::MarketDataUnavailable("503".into()).is_retryable());
        assert!(!TradingError::SoldOut.is_retryable());
        assert!(
            !TradingError::ReceiptTimeout {
                tx_hash: "0xabc".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_wrong_phase_message() {
        let e = TradingError::WrongPhase {
            actual: MarketPhase::Curve,
            expected: MarketPhase::Dex,
        };
        assert_eq!(
            e.to_string(),
            "Wrong market phase: token is in CURVE phase, operation requires DEX"
        );
    }
}
