pub mod error;
pub mod types;
pub mod units;
pub mod config;
pub mod pricing;
pub mod market_data;
pub mod phase;
pub mod session;
pub mod identity;
pub mod contracts;
pub mod chain;
pub mod wallet;
pub mod executor;

pub use error::{ErrorCategory, TradingError};
pub use types::*;
pub use config::{MarketDataConfig, TradingConfig, WalletProviderConfig};
pub use identity::{Identity, IdentityResolver};
pub use executor::TradeExecutor;
