//! Tool dispatch: JSON-RPC method routing and the tool handlers.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use nadfun_runtime::market_data::{MarketDataSource, TokenOrder};
use nadfun_runtime::units::parse_address;
use nadfun_runtime::{IdentityResolver, MarketPhase, TradeExecutor, TradingError};
use serde_json::{Value, json};

use crate::format;
use crate::protocol::{JSONRPC_VERSION, PROTOCOL_VERSION, Request, Response, ToolResult, error_codes};
use crate::tools::{ToolCall, ToolName};

pub const SERVER_NAME: &str = "nadfun-mcp";

/// Candidate window scanned by `search-tokens`.
const SEARCH_WINDOW: u32 = 52;

/// Per-call transport context.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub session_id: Option<String>,
}

impl ToolContext {
    pub fn with_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
        }
    }
}

pub struct NadfunTools {
    market: Arc<dyn MarketDataSource>,
    executor: Arc<TradeExecutor>,
    identities: IdentityResolver,
}

impl NadfunTools {
    pub fn new(
        market: Arc<dyn MarketDataSource>,
        executor: Arc<TradeExecutor>,
        identities: IdentityResolver,
    ) -> Self {
        Self {
            market,
            executor,
            identities,
        }
    }

    /// Handle one raw JSON-RPC message. Returns the serialized response, or
    /// `None` for notifications.
    pub async fn handle_message(&self, raw: &str, ctx: &ToolContext) -> Option<String> {
        let response = match serde_json::from_str::<Request>(raw) {
            Ok(req) => self.handle_request(req, ctx).await?,
            Err(e) => Response::error(
                Value::Null,
                error_codes::PARSE_ERROR,
                format!("Parse error: {e}"),
            ),
        };
        match serde_json::to_string(&response) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response");
                None
            }
        }
    }

    pub async fn handle_request(&self, req: Request, ctx: &ToolContext) -> Option<Response> {
        tracing::debug!(method = %req.method, "Handling MCP request");
        if req.is_notification() {
            return None;
        }
        let id = req.id.clone().unwrap_or(Value::Null);
        if req.jsonrpc != JSONRPC_VERSION {
            return Some(Response::error(
                id,
                error_codes::INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", req.jsonrpc),
            ));
        }

        let response = match req.method.as_str() {
            "initialize" => Response::success(id, initialize_result(req.params.as_ref())),
            "ping" => Response::success(id, json!({})),
            "tools/list" => Response::success(id, tools_list()),
            "tools/call" => {
                let Some((name, arguments)) = call_params(req.params) else {
                    return Some(Response::error(
                        id,
                        error_codes::INVALID_PARAMS,
                        "tools/call requires params.name",
                    ));
                };
                let result = self.call_tool(&name, arguments, ctx).await;
                match serde_json::to_value(result) {
                    Ok(v) => Response::success(id, v),
                    Err(e) => Response::error(id, error_codes::INTERNAL_ERROR, e.to_string()),
                }
            }
            other => Response::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        };
        Some(response)
    }

    /// Run one tool. Every failure, including a panic in a handler, comes
    /// back as an error result.
    pub async fn call_tool(&self, name: &str, arguments: Value, ctx: &ToolContext) -> ToolResult {
        let Some(tool) = ToolName::parse(name) else {
            return ToolResult::error(format!("Unknown tool: {name}"));
        };
        let call = match ToolCall::parse(tool, arguments) {
            Ok(call) => call,
            Err(e) => return ToolResult::error(format!("Invalid arguments for {tool}: {e}")),
        };

        tracing::info!(%tool, session = ctx.session_id.is_some(), "Tool call");
        match AssertUnwindSafe(self.dispatch(call, ctx)).catch_unwind().await {
            Ok(Ok(text)) => ToolResult::text(text),
            Ok(Err(e)) => {
                tracing::warn!(%tool, category = ?e.category(), error = %e, "Tool call failed");
                ToolResult::error(format::error(&e))
            }
            Err(_) => {
                tracing::error!(%tool, "Tool handler panicked");
                ToolResult::error(format!("Internal error while running {tool}"))
            }
        }
    }

    async fn dispatch(&self, call: ToolCall, ctx: &ToolContext) -> Result<String, TradingError> {
        let session = ctx.session_id.as_deref();
        match call {
            ToolCall::GetMonBalance(p) => {
                let address = parse_address(&p.address)?;
                let wei = self.executor.chain().native_balance(address).await?;
                Ok(format::balance(address, wei))
            }
            ToolCall::TransferMon(p) => {
                let identity = self.identities.resolve(session, p.private_key.as_deref()).await?;
                let result = self.executor.transfer_native(&p.to, &p.amount, &identity).await?;
                Ok(format::transfer(&result))
            }
            ToolCall::SearchTokens(p) => {
                let recent = self
                    .market
                    .tokens_by_order(TokenOrder::LatestTrade, 1, SEARCH_WINDOW)
                    .await?;
                let needle = p.query.trim().to_lowercase();
                let matches: Vec<_> = recent
                    .order_token
                    .iter()
                    .filter(|t| {
                        t.token_info.name.to_lowercase().contains(&needle)
                            || t.token_info.symbol.to_lowercase().contains(&needle)
                    })
                    .take(p.limit as usize)
                    .collect();
                Ok(format::search_results(&p.query, &matches))
            }
            ToolCall::TokenStats(p) => {
                parse_address(&p.token_address)?;
                let info = self.market.token_info(&p.token_address).await?;
                Ok(format::token_stats(&info))
            }
            ToolCall::AccountPositions(p) => {
                parse_address(&p.account_address)?;
                let resp = self
                    .market
                    .account_positions(
                        &p.account_address,
                        p.position_type,
                        p.paging.page,
                        p.paging.limit,
                    )
                    .await?;
                Ok(format::positions(&p.account_address, p.position_type, &resp))
            }
            ToolCall::AccountCreatedTokens(p) => {
                parse_address(&p.account_address)?;
                let resp = self
                    .market
                    .account_created_tokens(&p.account_address, p.paging.page, p.paging.limit)
                    .await?;
                Ok(format::created_tokens(&p.account_address, &resp))
            }
            ToolCall::ListTokensByCreationTime(p) => {
                self.list_tokens(TokenOrder::CreationTime, p.page, p.limit).await
            }
            ToolCall::ListTokensByMarketCap(p) => {
                self.list_tokens(TokenOrder::MarketCap, p.page, p.limit).await
            }
            ToolCall::ListTokensByLatestTrade(p) => {
                self.list_tokens(TokenOrder::LatestTrade, p.page, p.limit).await
            }
            ToolCall::TokenChart(p) => {
                parse_address(&p.token_address)?;
                let base = p
                    .base_timestamp
                    .unwrap_or_else(|| chrono::Utc::now().timestamp());
                let resp = self
                    .market
                    .token_chart(&p.token_address, p.interval, base)
                    .await?;
                Ok(format::chart(&p.token_address, p.interval, &resp))
            }
            ToolCall::TokenSwapHistory(p) => {
                parse_address(&p.token_address)?;
                let resp = self
                    .market
                    .token_swaps(&p.token_address, p.paging.page, p.paging.limit)
                    .await?;
                Ok(format::swaps(&p.token_address, &resp))
            }
            ToolCall::TokenMarket(p) => {
                parse_address(&p.token_address)?;
                let resp = self.market.token_market(&p.token_address).await?;
                Ok(format::market(&p.token_address, &resp))
            }
            ToolCall::TokenHolders(p) => {
                parse_address(&p.token_address)?;
                let resp = self
                    .market
                    .token_holders(&p.token_address, p.paging.page, p.paging.limit)
                    .await?;
                Ok(format::holders(&p.token_address, &resp))
            }
            ToolCall::MarketTypeInfo(p) => Ok(format::market_type_info(p.market_type).to_string()),
            ToolCall::MarketTypeComparison => Ok(format::MARKET_TYPE_COMPARISON.to_string()),
            ToolCall::TokenMarketPhase(p) => self.market_phase(&p.token_address).await,
            ToolCall::BuyTokensFromCurve(p) => {
                let identity = self.identities.resolve(session, p.private_key.as_deref()).await?;
                let result = self
                    .executor
                    .buy_exact_in(&p.token_address, &p.amount, &identity)
                    .await?;
                Ok(format::trade("Purchase Successful", &result))
            }
            ToolCall::ExactOutBuyTokensFromCurve(p) => {
                let identity = self.identities.resolve(session, p.private_key.as_deref()).await?;
                let result = self
                    .executor
                    .buy_exact_out(&p.token_address, &p.tokens_out, &identity)
                    .await?;
                Ok(format::trade("Exact-Out Purchase Successful", &result))
            }
            ToolCall::BuyTokensFromDex(p) => {
                let identity = self.identities.resolve(session, p.private_key.as_deref()).await?;
                let result = self
                    .executor
                    .buy_from_dex(&p.token_address, &p.amount, p.slippage_bps, &identity)
                    .await?;
                Ok(format::trade("DEX Purchase Successful", &result))
            }
            ToolCall::SellTokensToDex(p) => {
                let identity = self.identities.resolve(session, p.private_key.as_deref()).await?;
                let result = self
                    .executor
                    .sell_to_dex(&p.token_address, &p.amount, p.slippage_bps, &identity)
                    .await?;
                Ok(format::trade("DEX Sale Successful", &result))
            }
        }
    }

    async fn list_tokens(&self, order: TokenOrder, page: u32, limit: u32) -> Result<String, TradingError> {
        let resp = self.market.tokens_by_order(order, page, limit).await?;
        Ok(format::ordered_tokens(order, &resp))
    }

    async fn market_phase(&self, token: &str) -> Result<String, TradingError> {
        let address = parse_address(token)?;
        let (market, info) = futures::join!(self.market.token_market(token), self.market.token_info(token));
        let (market, info) = (market?, info?);

        let state = match market.market_type.parse::<MarketPhase>() {
            Ok(reported) => {
                let listed = info.is_listing.unwrap_or(false);
                let phase = self.executor.phases().observe(address, reported, listed);
                Some(market.to_state(address, phase)?)
            }
            Err(_) => None,
        };
        Ok(format::market_phase(token, &market.market_type, state.as_ref(), &info))
    }
}

fn initialize_result(params: Option<&Value>) -> Value {
    let version = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or(PROTOCOL_VERSION);
    json!({
        "protocolVersion": version,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "instructions": "Tools for reading and trading Nad.fun tokens on Monad. Check `token-market-phase` before trading: curve tools work only before listing, DEX tools only after.",
    })
}

fn tools_list() -> Value {
    let tools: Vec<Value> = ToolName::ALL.iter().map(ToolName::definition).collect();
    json!({ "tools": tools })
}

fn call_params(params: Option<Value>) -> Option<(String, Value)> {
    let mut params = params?;
    let name = params.get("name")?.as_str()?.to_string();
    let arguments = params
        .get_mut("arguments")
        .map(Value::take)
        .unwrap_or(Value::Null);
    Some((name, arguments))
}
