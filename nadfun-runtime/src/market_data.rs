//! Read-only access to the platform's indexer REST API.

use alloy::primitives::Address;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::MarketDataConfig;
use crate::error::TradingError;
use crate::types::{MarketPhase, MarketState};
use crate::units::parse_indexer_amount;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PositionFilter {
    All,
    #[default]
    Open,
    Close,
}

impl PositionFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionFilter::All => "all",
            PositionFilter::Open => "open",
            PositionFilter::Close => "close",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenOrder {
    CreationTime,
    MarketCap,
    LatestTrade,
}

impl TokenOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenOrder::CreationTime => "creation_time",
            TokenOrder::MarketCap => "market_cap",
            TokenOrder::LatestTrade => "latest_trade",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ChartInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[default]
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
}

impl ChartInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartInterval::OneMinute => "1m",
            ChartInterval::FiveMinutes => "5m",
            ChartInterval::FifteenMinutes => "15m",
            ChartInterval::ThirtyMinutes => "30m",
            ChartInterval::OneHour => "1h",
            ChartInterval::FourHours => "4h",
            ChartInterval::OneDay => "1d",
            ChartInterval::OneWeek => "1w",
        }
    }
}

// ── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSummary {
    pub token_address: String,
    pub name: String,
    pub symbol: String,
    pub image_uri: String,
    pub creator: Option<String>,
    pub total_supply: Option<String>,
    pub created_at: i64,
}

/// Token record from `/token/{addr}` and `/account/create_token/{addr}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenInfo {
    pub token_address: String,
    pub name: String,
    pub symbol: String,
    pub image_uri: String,
    pub creator: Option<String>,
    pub total_supply: Option<String>,
    pub description: Option<String>,
    pub is_listing: Option<bool>,
    pub market_cap: Option<String>,
    pub price: Option<String>,
    pub current_amount: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSummary {
    pub market_address: String,
    pub market_type: String,
    pub price: String,
}

/// Market record from `/token/market/{addr}`. Reserve figures are integer
/// strings in minor units.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenMarket {
    pub token_address: String,
    pub market_address: String,
    pub market_type: String,
    pub price: String,
    pub virtual_native: Option<String>,
    pub virtual_token: Option<String>,
    pub reserve_token: Option<String>,
    pub reserve_native: Option<String>,
    pub latest_trade_at: Option<i64>,
    pub created_at: i64,
}

impl TokenMarket {
    /// Numeric view of this record. `phase` is supplied by the caller, which
    /// also consults the listing flag.
    pub fn to_state(&self, token: Address, phase: MarketPhase) -> Result<MarketState, TradingError> {
        let field = |v: &Option<String>| parse_indexer_amount(v.as_deref().unwrap_or("0"));
        Ok(MarketState {
            token,
            phase,
            virtual_native: field(&self.virtual_native)?,
            virtual_token: field(&self.virtual_token)?,
            reserve_token: field(&self.reserve_token)?,
            reserve_native: field(&self.reserve_native)?,
            price: self.price.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    pub total_bought_native: String,
    pub total_bought_token: String,
    pub current_token_amount: String,
    pub realized_pnl: String,
    pub unrealized_pnl: String,
    pub total_pnl: String,
    pub created_at: i64,
    pub last_traded_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionEntry {
    pub token: TokenSummary,
    pub position: Position,
    pub market: MarketSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountPositions {
    pub account_address: String,
    pub positions: Vec<PositionEntry>,
    pub total_count: u64,
}

impl AccountPositions {
    /// Holding of `token` on this page, `None` when the page does not list it.
    pub fn holding_of(
        &self,
        token: Address,
    ) -> Result<Option<alloy::primitives::U256>, TradingError> {
        let entry = self.positions.iter().find(|p| {
            p.token
                .token_address
                .parse::<Address>()
                .is_ok_and(|a| a == token)
        });
        entry
            .map(|p| parse_indexer_amount(&p.position.current_token_amount))
            .transpose()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatedTokens {
    pub tokens: Vec<TokenInfo>,
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderedToken {
    pub token_info: TokenSummary,
    pub market_info: MarketSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderedTokens {
    pub order_type: String,
    pub order_token: Vec<OrderedToken>,
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartPoint {
    pub timestamp: i64,
    pub price: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenChart {
    pub prices: Vec<ChartPoint>,
    pub token_address: String,
    pub interval: String,
    pub base_timestamp: i64,
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Swap {
    pub swap_id: u64,
    pub account_address: String,
    pub token_address: String,
    pub is_buy: bool,
    pub mon_amount: String,
    pub token_amount: String,
    pub created_at: i64,
    pub transaction_hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSwaps {
    pub swaps: Vec<Swap>,
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Holder {
    pub current_amount: String,
    pub account_address: String,
    pub is_dev: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenHolders {
    pub holders: Vec<Holder>,
    pub total_count: u64,
}

// ── Source ──────────────────────────────────────────────────────────────────

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn account_positions(
        &self,
        account: &str,
        filter: PositionFilter,
        page: u32,
        limit: u32,
    ) -> Result<AccountPositions, TradingError>;

    async fn account_created_tokens(
        &self,
        account: &str,
        page: u32,
        limit: u32,
    ) -> Result<CreatedTokens, TradingError>;

    async fn tokens_by_order(
        &self,
        order: TokenOrder,
        page: u32,
        limit: u32,
    ) -> Result<OrderedTokens, TradingError>;

    async fn token_info(&self, token: &str) -> Result<TokenInfo, TradingError>;

    async fn token_chart(
        &self,
        token: &str,
        interval: ChartInterval,
        base_timestamp: i64,
    ) -> Result<TokenChart, TradingError>;

    async fn token_swaps(&self, token: &str, page: u32, limit: u32)
    -> Result<TokenSwaps, TradingError>;

    async fn token_market(&self, token: &str) -> Result<TokenMarket, TradingError>;

    async fn token_holders(
        &self,
        token: &str,
        page: u32,
        limit: u32,
    ) -> Result<TokenHolders, TradingError>;
}

#[derive(Debug, Clone)]
pub struct NadfunApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl NadfunApiClient {
    pub fn new(config: &MarketDataConfig) -> Result<Self, TradingError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, TradingError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| TradingError::MarketDataUnavailable(format!("{path}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(%path, %status, "Indexer request failed");
            return Err(TradingError::MarketDataUnavailable(format!(
                "{path} returned {status}: {body}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| TradingError::MarketDataUnavailable(format!("{path}: {e}")))
    }
}

fn paging(page: u32, limit: u32) -> Vec<(&'static str, String)> {
    vec![("page", page.to_string()), ("limit", limit.to_string())]
}

#[async_trait]
impl MarketDataSource for NadfunApiClient {
    async fn account_positions(
        &self,
        account: &str,
        filter: PositionFilter,
        page: u32,
        limit: u32,
    ) -> Result<AccountPositions, TradingError> {
        let mut query = vec![("position_type", filter.as_str().to_string())];
        query.extend(paging(page, limit));
        self.get(&format!("/account/position/{account}"), &query)
            .await
    }

    async fn account_created_tokens(
        &self,
        account: &str,
        page: u32,
        limit: u32,
    ) -> Result<CreatedTokens, TradingError> {
        self.get(
            &format!("/account/create_token/{account}"),
            &paging(page, limit),
        )
        .await
    }

    async fn tokens_by_order(
        &self,
        order: TokenOrder,
        page: u32,
        limit: u32,
    ) -> Result<OrderedTokens, TradingError> {
        self.get(&format!("/order/{}", order.as_str()), &paging(page, limit))
            .await
    }

    async fn token_info(&self, token: &str) -> Result<TokenInfo, TradingError> {
        self.get(&format!("/token/{token}"), &[]).await
    }

    async fn token_chart(
        &self,
        token: &str,
        interval: ChartInterval,
        base_timestamp: i64,
    ) -> Result<TokenChart, TradingError> {
        self.get(
            &format!("/token/chart/{token}"),
            &[
                ("interval", interval.as_str().to_string()),
                ("base_timestamp", base_timestamp.to_string()),
            ],
        )
        .await
    }

    async fn token_swaps(
        &self,
        token: &str,
        page: u32,
        limit: u32,
    ) -> Result<TokenSwaps, TradingError> {
        self.get(&format!("/token/swap/{token}"), &paging(page, limit))
            .await
    }

    async fn token_market(&self, token: &str) -> Result<TokenMarket, TradingError> {
        self.get(&format!("/token/market/{token}"), &[]).await
    }

    async fn token_holders(
        &self,
        token: &str,
        page: u32,
        limit: u32,
    ) -> Result<TokenHolders, TradingError> {
        self.get(&format!("/token/holder/{token}"), &paging(page, limit))
            .await
    }
}
