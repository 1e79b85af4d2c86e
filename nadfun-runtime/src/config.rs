//! Runtime configuration.
//!
//! Every component receives its config at construction. `from_env` reads
//! process environment; `from_lookup` takes any key lookup so tests can
//! exercise parsing without mutating process env.

use std::time::Duration;

use alloy::primitives::{Address, address};
use secrecy::SecretString;

use crate::error::TradingError;

pub const DEFAULT_API_URL: &str = "https://testnet-bot-api-server.nad.fun";
pub const DEFAULT_RPC_URL: &str = "https://testnet-rpc.monad.xyz";
pub const DEFAULT_PRIVY_API_URL: &str = "https://api.privy.io";
/// Monad testnet.
pub const DEFAULT_CHAIN_ID: u64 = 10143;

pub const CORE_ADDRESS: Address = address!("822EB1ADD41cf87C3F178100596cf24c9a6442f6");
pub const DEX_ROUTER_ADDRESS: Address = address!("619d07287e87C9c643C60882cA80d23C8ed44652");
pub const WRAPPED_NATIVE_ADDRESS: Address = address!("3bb9AFB94c82752E47706A10779EA525Cf95dc27");

/// Trading policy, contract addresses and chain parameters.
#[derive(Debug, Clone)]
pub struct TradingConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub core_address: Address,
    pub router_address: Address,
    pub wrapped_native_address: Address,
    /// Curve trade fee charged on top of the input amount.
    pub fee_bps: u32,
    /// Headroom added to the computed input of an exact-out buy.
    pub exact_out_buffer_bps: u32,
    pub default_slippage_bps: u32,
    pub deadline_secs: i64,
    pub gas_limit: u64,
    /// Wait before the post-trade position snapshot so the indexer can
    /// catch up.
    pub settle_delay: Duration,
    pub receipt_timeout: Duration,
    pub receipt_poll_interval: Duration,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            core_address: CORE_ADDRESS,
            router_address: DEX_ROUTER_ADDRESS,
            wrapped_native_address: WRAPPED_NATIVE_ADDRESS,
            fee_bps: 100,
            exact_out_buffer_bps: 500,
            default_slippage_bps: 50,
            deadline_secs: 20 * 60,
            gas_limit: 300_000,
            settle_delay: Duration::from_secs(2),
            receipt_timeout: Duration::from_secs(120),
            receipt_poll_interval: Duration::from_secs(1),
        }
    }
}

impl TradingConfig {
    pub fn from_env() -> Result<Self, TradingError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TradingError> {
        let mut cfg = Self::default();
        if let Some(url) = non_empty(lookup("RPC_URL")) {
            url::Url::parse(&url)
                .map_err(|e| TradingError::ConfigError(format!("Invalid RPC_URL: {e}")))?;
            cfg.rpc_url = url;
        }
        if let Some(v) = non_empty(lookup("CHAIN_ID")) {
            cfg.chain_id = parse_num("CHAIN_ID", &v)?;
        }
        if let Some(v) = non_empty(lookup("NADFUN_CORE_ADDRESS")) {
            cfg.core_address = parse_addr("NADFUN_CORE_ADDRESS", &v)?;
        }
        if let Some(v) = non_empty(lookup("NADFUN_ROUTER_ADDRESS")) {
            cfg.router_address = parse_addr("NADFUN_ROUTER_ADDRESS", &v)?;
        }
        if let Some(v) = non_empty(lookup("NADFUN_WRAPPED_NATIVE_ADDRESS")) {
            cfg.wrapped_native_address = parse_addr("NADFUN_WRAPPED_NATIVE_ADDRESS", &v)?;
        }
        if let Some(v) = non_empty(lookup("NADFUN_FEE_BPS")) {
            cfg.fee_bps = parse_bps("NADFUN_FEE_BPS", &v)?;
        }
        if let Some(v) = non_empty(lookup("NADFUN_EXACT_OUT_BUFFER_BPS")) {
            cfg.exact_out_buffer_bps = parse_num("NADFUN_EXACT_OUT_BUFFER_BPS", &v)?;
        }
        if let Some(v) = non_empty(lookup("NADFUN_DEFAULT_SLIPPAGE_BPS")) {
            cfg.default_slippage_bps = parse_bps("NADFUN_DEFAULT_SLIPPAGE_BPS", &v)?;
        }
        Ok(cfg)
    }
}

#[derive(Debug, Clone)]
pub struct MarketDataConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl MarketDataConfig {
    pub fn from_env() -> Result<Self, TradingError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TradingError> {
        let mut cfg = Self::default();
        if let Some(url) = non_empty(lookup("NADFUN_API_URL")) {
            url::Url::parse(&url)
                .map_err(|e| TradingError::ConfigError(format!("Invalid NADFUN_API_URL: {e}")))?;
            cfg.base_url = url.trim_end_matches('/').to_string();
        }
        Ok(cfg)
    }
}

/// Custodial wallet provider credentials. Absent credentials disable
/// wallet creation and session-wallet signing.
#[derive(Debug, Clone)]
pub struct WalletProviderConfig {
    pub api_url: String,
    pub app_id: String,
    pub app_secret: SecretString,
    pub chain_id: u64,
}

impl WalletProviderConfig {
    pub fn from_env(chain_id: u64) -> Option<Self> {
        Self::from_lookup(|k| std::env::var(k).ok(), chain_id)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, chain_id: u64) -> Option<Self> {
        let app_id = non_empty(lookup("PRIVY_APP_ID"))?;
        let app_secret = non_empty(lookup("PRIVY_APP_SECRET"))?;
        Some(Self {
            api_url: non_empty(lookup("PRIVY_API_URL"))
                .unwrap_or_else(|| DEFAULT_PRIVY_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            app_id,
            app_secret: SecretString::from(app_secret),
            chain_id,
        })
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_num<T: std::str::FromStr>(key: &str, v: &str) -> Result<T, TradingError>
where
    T::Err: std::fmt::Display,
{
    v.parse()
        .map_err(|e| TradingError::ConfigError(format!("Invalid {key}: {e}")))
}

fn parse_bps(key: &str, v: &str) -> Result<u32, TradingError> {
    let bps: u32 = parse_num(key, v)?;
    if bps > 10_000 {
        return Err(TradingError::ConfigError(format!(
            "{key} must be at most 10000 bps, got {bps}"
        )));
    }
    Ok(bps)
}

fn parse_addr(key: &str, v: &str) -> Result<Address, TradingError> {
    v.parse()
        .map_err(|e| TradingError::ConfigError(format!("Invalid {key}: {e}")))
}
