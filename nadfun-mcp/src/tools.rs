//! Tool catalogue: names, descriptions, typed parameters and their JSON
//! schemas.

use nadfun_runtime::MarketPhase;
use nadfun_runtime::market_data::{ChartInterval, PositionFilter};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolName {
    GetMonBalance,
    TransferMon,
    SearchTokens,
    TokenStats,
    AccountPositions,
    AccountCreatedTokens,
    ListTokensByCreationTime,
    ListTokensByMarketCap,
    ListTokensByLatestTrade,
    TokenChart,
    TokenSwapHistory,
    TokenMarket,
    TokenHolders,
    MarketTypeInfo,
    MarketTypeComparison,
    TokenMarketPhase,
    BuyTokensFromCurve,
    ExactOutBuyTokensFromCurve,
    BuyTokensFromDex,
    SellTokensToDex,
}

impl ToolName {
    pub const ALL: [ToolName; 20] = [
        ToolName::GetMonBalance,
        ToolName::TransferMon,
        ToolName::SearchTokens,
        ToolName::TokenStats,
        ToolName::AccountPositions,
        ToolName::AccountCreatedTokens,
        ToolName::ListTokensByCreationTime,
        ToolName::ListTokensByMarketCap,
        ToolName::ListTokensByLatestTrade,
        ToolName::TokenChart,
        ToolName::TokenSwapHistory,
        ToolName::TokenMarket,
        ToolName::TokenHolders,
        ToolName::MarketTypeInfo,
        ToolName::MarketTypeComparison,
        ToolName::TokenMarketPhase,
        ToolName::BuyTokensFromCurve,
        ToolName::ExactOutBuyTokensFromCurve,
        ToolName::BuyTokensFromDex,
        ToolName::SellTokensToDex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::GetMonBalance => "get-mon-balance",
            ToolName::TransferMon => "transfer-mon",
            ToolName::SearchTokens => "search-tokens",
            ToolName::TokenStats => "token-stats",
            ToolName::AccountPositions => "account-positions",
            ToolName::AccountCreatedTokens => "account-created-tokens",
            ToolName::ListTokensByCreationTime => "list-tokens-by-creation-time",
            ToolName::ListTokensByMarketCap => "list-tokens-by-market-cap",
            ToolName::ListTokensByLatestTrade => "list-tokens-by-latest-trade",
            ToolName::TokenChart => "token-chart",
            ToolName::TokenSwapHistory => "token-swap-history",
            ToolName::TokenMarket => "token-market",
            ToolName::TokenHolders => "token-holders",
            ToolName::MarketTypeInfo => "market-type-info",
            ToolName::MarketTypeComparison => "market-type-comparison",
            ToolName::TokenMarketPhase => "token-market-phase",
            ToolName::BuyTokensFromCurve => "buy-tokens-from-curve",
            ToolName::ExactOutBuyTokensFromCurve => "exact-out-buy-tokens-from-curve",
            ToolName::BuyTokensFromDex => "buy-tokens-from-dex",
            ToolName::SellTokensToDex => "sell-tokens-to-dex",
        }
    }

    pub fn parse(name: &str) -> Option<ToolName> {
        ToolName::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolName::GetMonBalance => "Get MON balance for a Monad address",
            ToolName::TransferMon => "Transfer MON to a Monad address",
            ToolName::SearchTokens => "Search for tokens on Nad.fun by name or symbol",
            ToolName::TokenStats => "Get detailed stats for a specific Nad.fun token",
            ToolName::AccountPositions => "Get token positions held by an account",
            ToolName::AccountCreatedTokens => "Get tokens created by a specific account",
            ToolName::ListTokensByCreationTime => {
                "Get tokens ordered by creation time (newest first)"
            }
            ToolName::ListTokensByMarketCap => "Get tokens ordered by market cap (highest first)",
            ToolName::ListTokensByLatestTrade => "Get tokens ordered by latest trade time",
            ToolName::TokenChart => "Get chart data for a specific token",
            ToolName::TokenSwapHistory => "Get swap history for a specific token",
            ToolName::TokenMarket => "Get market information for a specific token",
            ToolName::TokenHolders => "Get list of holders for a specific token",
            ToolName::MarketTypeInfo => {
                "Get detailed information about a specific market type (CURVE or DEX)"
            }
            ToolName::MarketTypeComparison => "Get a comparison between CURVE and DEX market types",
            ToolName::TokenMarketPhase => {
                "Get detailed information about a token's current market phase"
            }
            ToolName::BuyTokensFromCurve => {
                "Buy tokens from the bonding curve with an amount of MON (CURVE phase only)"
            }
            ToolName::ExactOutBuyTokensFromCurve => {
                "Buy an exact amount of tokens from the bonding curve (CURVE phase only)"
            }
            ToolName::BuyTokensFromDex => "Buy tokens from the DEX with MON (DEX phase only)",
            ToolName::SellTokensToDex => "Sell tokens to the DEX for MON (DEX phase only)",
        }
    }

    /// JSON schema of this tool's arguments object.
    pub fn input_schema(&self) -> Value {
        match self {
            ToolName::GetMonBalance => schema::<BalanceParams>(),
            ToolName::TransferMon => schema::<TransferParams>(),
            ToolName::SearchTokens => schema::<SearchParams>(),
            ToolName::TokenStats | ToolName::TokenMarket | ToolName::TokenMarketPhase => {
                schema::<TokenParams>()
            }
            ToolName::AccountPositions => schema::<AccountPositionsParams>(),
            ToolName::AccountCreatedTokens => schema::<AccountPageParams>(),
            ToolName::ListTokensByCreationTime
            | ToolName::ListTokensByMarketCap
            | ToolName::ListTokensByLatestTrade => schema::<PageParams>(),
            ToolName::TokenChart => schema::<ChartParams>(),
            ToolName::TokenSwapHistory | ToolName::TokenHolders => schema::<TokenPageParams>(),
            ToolName::MarketTypeInfo => schema::<MarketTypeParams>(),
            ToolName::MarketTypeComparison => schema::<NoParams>(),
            ToolName::BuyTokensFromCurve => schema::<CurveBuyParams>(),
            ToolName::ExactOutBuyTokensFromCurve => schema::<ExactOutBuyParams>(),
            ToolName::BuyTokensFromDex | ToolName::SellTokensToDex => schema::<DexTradeParams>(),
        }
    }

    /// Entry for a `tools/list` response.
    pub fn definition(&self) -> Value {
        serde_json::json!({
            "name": self.as_str(),
            "description": self.description(),
            "inputSchema": self.input_schema(),
        })
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn schema<T: JsonSchema>() -> Value {
    let mut value: Value = schemars::schema_for!(T).into();
    if let Value::Object(map) = &mut value {
        map.remove("$schema");
        map.remove("title");
    }
    value
}

// ── Parameters ──────────────────────────────────────────────────────────────

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceParams {
    /// Monad address to check
    pub address: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferParams {
    /// Recipient address
    pub to: String,
    /// Amount of MON to send
    pub amount: String,
    /// Private key of the sender (not stored). Not needed when the session has a wallet.
    #[serde(default)]
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Token name or symbol to search for
    pub query: String,
    /// Maximum number of results to return
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenParams {
    /// Token contract address
    pub token_address: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    /// Page number
    #[serde(default = "default_page")]
    pub page: u32,
    /// Number of items per page
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountPageParams {
    /// Account EOA address
    pub account_address: String,
    #[serde(flatten)]
    pub paging: PageParams,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountPositionsParams {
    /// Account EOA address
    pub account_address: String,
    /// Type of positions to retrieve
    #[serde(default)]
    pub position_type: PositionFilter,
    #[serde(flatten)]
    pub paging: PageParams,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPageParams {
    /// Token contract address
    pub token_address: String,
    #[serde(flatten)]
    pub paging: PageParams,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartParams {
    /// Token contract address
    pub token_address: String,
    /// Chart interval
    #[serde(default)]
    pub interval: ChartInterval,
    /// Base timestamp in epoch seconds (current time if omitted)
    #[serde(default)]
    pub base_timestamp: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarketTypeParams {
    /// Market type to get information about
    pub market_type: MarketPhase,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct NoParams {}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurveBuyParams {
    /// Token contract address to buy
    pub token_address: String,
    /// Amount of MON to spend
    pub amount: String,
    /// Private key of the sender (not stored). Not needed when the session has a wallet.
    #[serde(default)]
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExactOutBuyParams {
    /// Token contract address to buy
    pub token_address: String,
    /// Exact amount of tokens to receive
    pub tokens_out: String,
    /// Private key of the sender (not stored). Not needed when the session has a wallet.
    #[serde(default)]
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DexTradeParams {
    /// Token contract address
    pub token_address: String,
    /// Amount of MON to spend when buying, or tokens to sell
    pub amount: String,
    /// Slippage tolerance in basis points (default 50 = 0.5%)
    #[serde(default)]
    pub slippage_bps: Option<u32>,
    /// Private key of the sender (not stored). Not needed when the session has a wallet.
    #[serde(default)]
    pub private_key: Option<String>,
}

/// A tool call with its arguments decoded into the tool's parameter type.
#[derive(Debug, Clone)]
pub enum ToolCall {
    GetMonBalance(BalanceParams),
    TransferMon(TransferParams),
    SearchTokens(SearchParams),
    TokenStats(TokenParams),
    AccountPositions(AccountPositionsParams),
    AccountCreatedTokens(AccountPageParams),
    ListTokensByCreationTime(PageParams),
    ListTokensByMarketCap(PageParams),
    ListTokensByLatestTrade(PageParams),
    TokenChart(ChartParams),
    TokenSwapHistory(TokenPageParams),
    TokenMarket(TokenParams),
    TokenHolders(TokenPageParams),
    MarketTypeInfo(MarketTypeParams),
    MarketTypeComparison,
    TokenMarketPhase(TokenParams),
    BuyTokensFromCurve(CurveBuyParams),
    ExactOutBuyTokensFromCurve(ExactOutBuyParams),
    BuyTokensFromDex(DexTradeParams),
    SellTokensToDex(DexTradeParams),
}

fn decode<T: DeserializeOwned>(arguments: Value) -> Result<T, String> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| e.to_string())
}

fn check_paging(p: &PageParams) -> Result<(), String> {
    if p.page == 0 {
        return Err("page must be at least 1".into());
    }
    if p.limit == 0 || p.limit > MAX_PAGE_LIMIT {
        return Err(format!("limit must be between 1 and {MAX_PAGE_LIMIT}"));
    }
    Ok(())
}

impl ToolCall {
    /// Decode and validate `arguments` for `tool`.
    pub fn parse(tool: ToolName, arguments: Value) -> Result<ToolCall, String> {
        let call = match tool {
            ToolName::GetMonBalance => ToolCall::GetMonBalance(decode(arguments)?),
            ToolName::TransferMon => ToolCall::TransferMon(decode(arguments)?),
            ToolName::SearchTokens => ToolCall::SearchTokens(decode(arguments)?),
            ToolName::TokenStats => ToolCall::TokenStats(decode(arguments)?),
            ToolName::AccountPositions => ToolCall::AccountPositions(decode(arguments)?),
            ToolName::AccountCreatedTokens => ToolCall::AccountCreatedTokens(decode(arguments)?),
            ToolName::ListTokensByCreationTime => {
                ToolCall::ListTokensByCreationTime(decode(arguments)?)
            }
            ToolName::ListTokensByMarketCap => ToolCall::ListTokensByMarketCap(decode(arguments)?),
            ToolName::ListTokensByLatestTrade => {
                ToolCall::ListTokensByLatestTrade(decode(arguments)?)
            }
            ToolName::TokenChart => ToolCall::TokenChart(decode(arguments)?),
            ToolName::TokenSwapHistory => ToolCall::TokenSwapHistory(decode(arguments)?),
            ToolName::TokenMarket => ToolCall::TokenMarket(decode(arguments)?),
            ToolName::TokenHolders => ToolCall::TokenHolders(decode(arguments)?),
            ToolName::MarketTypeInfo => ToolCall::MarketTypeInfo(decode(arguments)?),
            ToolName::MarketTypeComparison => {
                let _: NoParams = decode(arguments)?;
                ToolCall::MarketTypeComparison
            }
            ToolName::TokenMarketPhase => ToolCall::TokenMarketPhase(decode(arguments)?),
            ToolName::BuyTokensFromCurve => ToolCall::BuyTokensFromCurve(decode(arguments)?),
            ToolName::ExactOutBuyTokensFromCurve => {
                ToolCall::ExactOutBuyTokensFromCurve(decode(arguments)?)
            }
            ToolName::BuyTokensFromDex => ToolCall::BuyTokensFromDex(decode(arguments)?),
            ToolName::SellTokensToDex => ToolCall::SellTokensToDex(decode(arguments)?),
        };
        call.validate()?;
        Ok(call)
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            ToolCall::SearchTokens(p) => {
                if p.query.trim().is_empty() {
                    return Err("query must not be empty".into());
                }
                if p.limit == 0 || p.limit > MAX_PAGE_LIMIT {
                    return Err(format!("limit must be between 1 and {MAX_PAGE_LIMIT}"));
                }
                Ok(())
            }
            ToolCall::AccountPositions(p) => check_paging(&p.paging),
            ToolCall::AccountCreatedTokens(p) => check_paging(&p.paging),
            ToolCall::ListTokensByCreationTime(p)
            | ToolCall::ListTokensByMarketCap(p)
            | ToolCall::ListTokensByLatestTrade(p) => check_paging(p),
            ToolCall::TokenSwapHistory(p) | ToolCall::TokenHolders(p) => check_paging(&p.paging),
            _ => Ok(()),
        }
    }
}
