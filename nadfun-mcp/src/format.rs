//! Markdown rendering of tool results.

use std::fmt::Write;

use alloy::primitives::{Address, U256};
use nadfun_runtime::market_data::{
    AccountPositions, ChartInterval, CreatedTokens, OrderedToken, OrderedTokens, PositionFilter,
    TokenChart, TokenHolders, TokenInfo, TokenMarket, TokenOrder, TokenSwaps,
};
use nadfun_runtime::phase::available_supply;
use nadfun_runtime::units::format_amount;
use nadfun_runtime::{ErrorCategory, MarketPhase, MarketState, TradeResult, TradingError, TransferResult};
use rust_decimal::Decimal;

pub const CURVE_MARKET_INFO: &str = "\
# Bonding Curve Market

A bonding curve is a mathematical mechanism that establishes the price of a token. In the Nad.fun bonding curve:

- The price increases as more tokens are bought
- The price decreases as tokens are sold
- The formula follows a constant product curve: price = virtualNative / virtualToken
- Tokens in this phase **cannot be transferred** - they must be bought and sold directly with the bonding curve
- Available token amount is calculated as `reserveToken - targetToken`

## Lifecycle

1. Tokens are initially sold through the bonding curve
2. Once all available tokens are sold, the token is automatically listed on DEX
3. The transition happens when someone buys the exact remaining tokens using the `exactOutBuy` function

## Trading

- Buy: Use the `buy` function with an amount of MON to spend
- ExactOutBuy: Use the `exactOutBuy` function to purchase an exact amount of tokens
- Buying the last tokens triggers DEX listing
- A 1% fee is added to all transactions

## Benefits

- Guaranteed liquidity
- Deterministic pricing formula
- Automatic price discovery
- No need for initial liquidity provision
";

pub const DEX_MARKET_INFO: &str = "\
# DEX Market

Once a token has sold out its bonding curve allocation, it gets listed on the Nad.fun decentralized exchange (DEX), which uses a Uniswap-compatible protocol. In the DEX:

- Tokens can be freely transferred like standard ERC-20 tokens
- Price is determined by supply and demand
- Liquidity is provided in a trading pair with WMON (Wrapped MON)
- Trading follows the Automated Market Maker (AMM) model

## Lifecycle

1. Token is automatically listed on DEX after all bonding curve tokens are purchased
2. Initial liquidity is created from the bonding curve reserves
3. Additional liquidity can be added by any token holder

## Trading

- Buy: Use `swapExactNativeForTokens` to buy with a specific amount of MON
- Sell: Use `swapExactTokensForNative` to sell a specific amount of tokens
- Always set a slippage tolerance to account for price movement (typically 0.5%)
- Tokens need to be approved before selling

## Benefits

- Free transferability
- Market-driven pricing
- Trading pair liquidity
- Standard ERC-20 token functionality
";

pub const MARKET_TYPE_COMPARISON: &str = "\
# Nad.fun Market Types

Nad.fun has two main market types:

## Bonding Curve (CURVE)

- **Initial Phase**: Tokens are first sold through a bonding curve
- **Price Formation**: Price follows a mathematical formula (constant product)
- **Transfers**: Tokens cannot be transferred during this phase
- **Liquidity**: Always available through the curve mechanism
- **End Condition**: Phase ends when all available tokens are purchased

## Decentralized Exchange (DEX)

- **Second Phase**: Tokens move to DEX after bonding curve sells out
- **Price Formation**: Price determined by market supply and demand
- **Transfers**: Standard ERC-20 tokens that can be freely transferred
- **Liquidity**: Provided through MON/Token trading pairs
- **Trading**: Standard AMM swaps with configurable slippage

The transition from CURVE to DEX is automatic when the last tokens are purchased from the bonding curve.
";

pub fn market_type_info(phase: MarketPhase) -> &'static str {
    match phase {
        MarketPhase::Curve => CURVE_MARKET_INFO,
        MarketPhase::Dex => DEX_MARKET_INFO,
    }
}

/// Epoch seconds as a UTC timestamp, or the raw number if out of range.
pub fn timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

fn yes_no(v: bool) -> &'static str {
    if v { "Yes" } else { "No" }
}

// `write!` into a String is infallible.

pub fn balance(address: Address, wei: U256) -> String {
    format!("Balance of {address}: {} MON", format_amount(wei))
}

pub fn transfer(result: &TransferResult) -> String {
    format!(
        "# Transfer Confirmed\n\n- From: {}\n- To: {}\n- Amount: {} MON\n- Transaction: {}\n",
        result.from,
        result.to,
        format_amount(result.amount),
        result.tx_hash
    )
}

pub fn search_results(query: &str, matches: &[&OrderedToken]) -> String {
    if matches.is_empty() {
        return format!("No tokens found matching \"{query}\".");
    }
    let mut out = format!("Found {} token(s) matching \"{query}\":\n", matches.len());
    for item in matches {
        let t = &item.token_info;
        let m = &item.market_info;
        let _ = write!(
            out,
            "\n{} ({}):\n- Address: {}\n- Price: {}\n- Created: {}\n- Market Type: {}\n",
            t.name,
            t.symbol,
            t.token_address,
            m.price,
            timestamp(t.created_at),
            m.market_type,
        );
        if let Some(creator) = &t.creator {
            let _ = writeln!(out, "- Creator: {creator}");
        }
    }
    out
}

pub fn token_stats(info: &TokenInfo) -> String {
    let mut out = format!(
        "# {} ({})\n\n## Basic Information\n- Address: {}\n",
        info.name, info.symbol, info.token_address
    );
    if let Some(supply) = &info.total_supply {
        let _ = writeln!(out, "- Total Supply: {supply}");
    }
    if let Some(description) = info.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(out, "- Description: {description}");
    }
    if let Some(creator) = &info.creator {
        let _ = writeln!(out, "- Creator: {creator}");
    }
    if let Some(price) = &info.price {
        let _ = writeln!(out, "- Price: {price} MON");
    }
    if let Some(cap) = &info.market_cap {
        let _ = writeln!(out, "- Market Cap: {cap} MON");
    }
    let _ = writeln!(out, "- Listed on DEX: {}", yes_no(info.is_listing.unwrap_or(false)));
    let _ = writeln!(out, "- Created: {}", timestamp(info.created_at));
    out
}

pub fn positions(account: &str, filter: PositionFilter, resp: &AccountPositions) -> String {
    let kind = filter.as_str();
    if resp.positions.is_empty() {
        return format!("No {kind} positions found for account {account}.");
    }
    let mut out = format!(
        "# Account Positions\n\nFound {} {kind} positions for account {account}:\n",
        resp.positions.len()
    );
    for (i, entry) in resp.positions.iter().enumerate() {
        let (t, p, m) = (&entry.token, &entry.position, &entry.market);
        let _ = write!(
            out,
            "\n## {}. {} ({})\n\
             - Token Address: {}\n\
             - Current Amount: {}\n\
             - Total Bought (MON): {}\n\
             - Total Bought (Token): {}\n\
             - Realized PnL (MON): {}\n\
             - Unrealized PnL (MON): {}\n\
             - Total PnL (MON): {}\n\
             - Current Price: {} MON\n\
             - Market Type: {}\n\
             - Last Traded: {}\n",
            i + 1,
            t.name,
            t.symbol,
            t.token_address,
            p.current_token_amount,
            p.total_bought_native,
            p.total_bought_token,
            p.realized_pnl,
            p.unrealized_pnl,
            p.total_pnl,
            m.price,
            m.market_type,
            timestamp(p.last_traded_at),
        );
    }
    out
}

pub fn created_tokens(account: &str, resp: &CreatedTokens) -> String {
    if resp.tokens.is_empty() {
        return format!("No tokens found created by account {account}.");
    }
    let mut out = format!(
        "# Tokens Created by Account\n\nFound {} tokens created by account {account}:\n",
        resp.tokens.len()
    );
    for (i, t) in resp.tokens.iter().enumerate() {
        let _ = write!(out, "\n## {}. {} ({})\n- Token Address: {}\n", i + 1, t.name, t.symbol, t.token_address);
        if let Some(d) = t.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = writeln!(out, "- Description: {d}");
        }
        if let Some(supply) = &t.total_supply {
            let _ = writeln!(out, "- Total Supply: {supply}");
        }
        if let Some(price) = &t.price {
            let _ = writeln!(out, "- Current Price: {price} MON");
        }
        if let Some(cap) = &t.market_cap {
            let _ = writeln!(out, "- Market Cap: {cap} MON");
        }
        if let Some(amount) = &t.current_amount {
            let _ = writeln!(out, "- Current Amount: {amount}");
        }
        let _ = writeln!(out, "- Listed: {}", yes_no(t.is_listing.unwrap_or(false)));
        let _ = writeln!(out, "- Created: {}", timestamp(t.created_at));
    }
    out
}

pub fn ordered_tokens(order: TokenOrder, resp: &OrderedTokens) -> String {
    if resp.order_token.is_empty() {
        return "No tokens found.".into();
    }
    let (title, by) = match order {
        TokenOrder::CreationTime => ("Newest Tokens on Nad.fun", "creation time"),
        TokenOrder::MarketCap => ("Top Tokens by Market Cap on Nad.fun", "market cap"),
        TokenOrder::LatestTrade => ("Most Recently Traded Tokens on Nad.fun", "latest trade"),
    };
    let mut out = format!(
        "# {title}\n\nFound {} tokens (ordered by {by}):\n",
        resp.order_token.len()
    );
    for (i, item) in resp.order_token.iter().enumerate() {
        let (t, m) = (&item.token_info, &item.market_info);
        let _ = write!(
            out,
            "\n## {}. {} ({})\n- Token Address: {}\n- Price: {}\n",
            i + 1,
            t.name,
            t.symbol,
            t.token_address,
            m.price
        );
        if let Some(creator) = &t.creator {
            let _ = writeln!(out, "- Creator: {creator}");
        }
        if let Some(supply) = &t.total_supply {
            let _ = writeln!(out, "- Total Supply: {supply}");
        }
        let _ = writeln!(out, "- Market Type: {}", m.market_type);
        let _ = writeln!(out, "- Created: {}", timestamp(t.created_at));
    }
    out
}

const CHART_ROWS: usize = 10;

pub fn chart(token: &str, interval: ChartInterval, resp: &TokenChart) -> String {
    if resp.prices.is_empty() {
        return format!("No chart data found for token {token}.");
    }
    let mut out = format!(
        "# Price Chart for Token ({token})\n\nInterval: {}\nTotal data points: {}\n\n| Time | Price |\n|------|-------|\n",
        interval.as_str(),
        resp.prices.len()
    );
    let skip = resp.prices.len().saturating_sub(CHART_ROWS);
    for point in &resp.prices[skip..] {
        let _ = writeln!(out, "| {} | {} |", timestamp(point.timestamp), point.price);
    }

    let prices: Vec<Decimal> = resp
        .prices
        .iter()
        .filter_map(|p| p.price.parse().ok())
        .collect();
    if let (Some(min), Some(max)) = (prices.iter().min(), prices.iter().max()) {
        let sum: Decimal = prices.iter().sum();
        let avg = sum / Decimal::from(prices.len());
        let _ = write!(
            out,
            "\n## Statistics\n- Minimum Price: {}\n- Maximum Price: {}\n- Average Price: {}\n",
            min.round_dp(8),
            max.round_dp(8),
            avg.round_dp(8)
        );
    }
    out
}

pub fn swaps(token: &str, resp: &TokenSwaps) -> String {
    if resp.swaps.is_empty() {
        return format!("No swap history found for token {token}.");
    }
    let mut out = format!(
        "# Swap History for Token ({token})\n\nFound {} swaps:\n",
        resp.swaps.len()
    );
    for (i, s) in resp.swaps.iter().enumerate() {
        let _ = write!(
            out,
            "\n## {}. {} on {}\n- Account: {}\n- MON Amount: {}\n- Token Amount: {}\n- Transaction: {}\n",
            i + 1,
            if s.is_buy { "Buy" } else { "Sell" },
            timestamp(s.created_at),
            s.account_address,
            s.mon_amount,
            s.token_amount,
            s.transaction_hash
        );
    }
    out
}

pub fn market(token: &str, m: &TokenMarket) -> String {
    let mut out = format!(
        "# Market Information for Token ({token})\n\n- Market ID: {}\n- Market Type: {}\n- Current Price: {}\n",
        m.market_address, m.market_type, m.price
    );
    let optional = [
        ("Virtual Native", &m.virtual_native),
        ("Virtual Token", &m.virtual_token),
        ("Reserve Token", &m.reserve_token),
        ("Reserve Native", &m.reserve_native),
    ];
    for (label, value) in optional {
        if let Some(v) = value {
            let _ = writeln!(out, "- {label}: {v}");
        }
    }
    if let Some(at) = m.latest_trade_at {
        let _ = writeln!(out, "- Latest Trade: {}", timestamp(at));
    }
    let _ = writeln!(out, "- Created: {}", timestamp(m.created_at));
    out
}

pub fn holders(token: &str, resp: &TokenHolders) -> String {
    if resp.holders.is_empty() {
        return format!("No holders found for token {token}.");
    }
    let mut out = format!(
        "# Holders for Token ({token})\n\nFound {} holders:\n",
        resp.holders.len()
    );
    for (i, h) in resp.holders.iter().enumerate() {
        let _ = write!(
            out,
            "\n## {}. {}\n- Amount: {}\n- Developer: {}\n",
            i + 1,
            h.account_address,
            h.current_amount,
            yes_no(h.is_dev)
        );
    }
    out
}

/// Phase summary. `state` is `None` when the indexer reports a market type
/// this server does not know.
pub fn market_phase(
    token: &str,
    market_type: &str,
    state: Option<&MarketState>,
    info: &TokenInfo,
) -> String {
    let listed = yes_no(info.is_listing.unwrap_or(false));
    match state {
        Some(s) if s.phase == MarketPhase::Curve => format!(
            "# Token Market Phase: Bonding Curve\n\n\
             This token ({token}) is currently in the **Bonding Curve** phase.\n\n\
             ## Current Status\n\
             - Market Type: CURVE\n\
             - Token Name: {}\n\
             - Symbol: {}\n\
             - Current Price: {} MON\n\
             - Available Tokens: {}\n\
             - Virtual Native: {}\n\
             - Virtual Token: {}\n\n\
             ## What This Means\n\
             - Tokens can be purchased through the bonding curve mechanism\n\
             - Tokens **cannot be transferred** in this phase\n\
             - The price follows a mathematical formula (constant product)\n\
             - When all available tokens are purchased, the token will be automatically listed on DEX\n\n\
             ## How to Trade\n\
             - Use the `buy-tokens-from-curve` tool to purchase tokens with MON\n\
             - If you want to purchase the exact remaining tokens, use the `exact-out-buy-tokens-from-curve` tool\n",
            info.name,
            info.symbol,
            s.price,
            format_amount(available_supply(s)),
            format_amount(s.virtual_native),
            format_amount(s.virtual_token),
        ),
        Some(s) => format!(
            "# Token Market Phase: DEX\n\n\
             This token ({token}) is currently in the **DEX** phase.\n\n\
             ## Current Status\n\
             - Market Type: DEX\n\
             - Token Name: {}\n\
             - Symbol: {}\n\
             - Current Price: {} MON\n\
             - Listed on DEX: {listed}\n\n\
             ## What This Means\n\
             - Tokens can be freely transferred like standard ERC-20 tokens\n\
             - Trading happens through the DEX (Uniswap-compatible)\n\
             - Price is determined by market supply and demand\n\
             - Liquidity is provided through MON/Token trading pairs\n\n\
             ## How to Trade\n\
             - Use the `buy-tokens-from-dex` tool to purchase tokens with MON\n\
             - Use the `sell-tokens-to-dex` tool to sell tokens for MON\n\
             - Always set a slippage tolerance (default 0.5%) to account for price movement\n",
            info.name, info.symbol, s.price,
        ),
        None => format!(
            "# Token Market Phase: Unknown\n\n\
             This token ({token}) has an unknown market type: {market_type}.\n\n\
             ## Current Status\n\
             - Market Type: {market_type}\n\
             - Token Name: {}\n\
             - Symbol: {}\n\
             - Listed on DEX: {listed}\n\n\
             Please check with Nad.fun support for more information about this market type.\n",
            info.name, info.symbol,
        ),
    }
}

pub fn trade(title: &str, result: &TradeResult) -> String {
    let mut out = format!("# {title}\n\n{}\n\n- Transaction: {}\n", result.message, result.tx_hash);
    if let Some(approval) = &result.approval_tx_hash {
        let _ = writeln!(out, "- Approval Transaction: {approval}");
    }
    if let Some(total) = result.total_value {
        let _ = writeln!(out, "- Total MON Sent: {}", format_amount(total));
    }
    if let Some(est) = result.estimated_out {
        let _ = writeln!(out, "- Estimated Output: {}", format_amount(est));
    }
    match result.observed_out {
        Some(observed) if result.reconciled => {
            let _ = writeln!(out, "- Observed Output: {}", format_amount(observed));
        }
        _ => {
            let _ = writeln!(out, "- Observed Output: unavailable, the estimate above is unconfirmed");
        }
    }
    if result.triggers_listing {
        let _ = writeln!(out, "- This purchase completes the bonding curve and lists the token on the DEX");
    }
    out
}

pub fn error(e: &TradingError) -> String {
    let mut out = format!("Error: {e}");
    let hint = match e {
        TradingError::WrongPhase {
            expected: MarketPhase::Curve,
            ..
        } => Some("The token is listed. Use `buy-tokens-from-dex` or `sell-tokens-to-dex` instead."),
        TradingError::WrongPhase {
            expected: MarketPhase::Dex,
            ..
        } => Some("The token is still on its bonding curve. Use `buy-tokens-from-curve` instead."),
        TradingError::ExceedsAvailableSupply { .. } => {
            Some("Use `exact-out-buy-tokens-from-curve` to buy the remaining supply.")
        }
        TradingError::NoIdentity => {
            Some("Sign in through /auth/google to use a session wallet, or pass `privateKey`.")
        }
        _ if e.is_retryable() => Some("This looks temporary; retrying the same call may succeed."),
        _ => None,
    };
    if let Some(hint) = hint {
        out.push_str("\n\n");
        out.push_str(hint);
    }
    if e.category() == ErrorCategory::TransactionOutcome {
        out.push_str("\n\nThe transaction was not resubmitted.");
    }
    out
}
