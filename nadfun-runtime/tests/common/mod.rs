//! In-process fakes for the executor's collaborators.
//!
//! Each fake records the calls it receives and replays scripted responses in
//! order. When a script runs dry the last response repeats.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use nadfun_runtime::chain::{ChainGateway, TxCall, TxReceipt};
use nadfun_runtime::config::TradingConfig;
use nadfun_runtime::identity::{Identity, validate_private_key};
use nadfun_runtime::market_data::*;
use nadfun_runtime::wallet::{CreatedWallet, CustodialWallet};
use nadfun_runtime::{TradeExecutor, TradingError};
use secrecy::SecretString;

// Hardhat account #0
pub const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const KEY_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const TOKEN: &str = "0x00000000000000000000000000000000000000bb";

pub fn supplied_key() -> Identity {
    Identity::SuppliedKey {
        raw_key: validate_private_key(KEY).unwrap(),
    }
}

fn next<T: Clone>(script: &Mutex<VecDeque<T>>) -> Option<T> {
    let mut q = script.lock().unwrap();
    if q.len() > 1 { q.pop_front() } else { q.front().cloned() }
}

// ── Market data ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeMarket {
    pub markets: Mutex<VecDeque<TokenMarket>>,
    pub infos: Mutex<VecDeque<TokenInfo>>,
    /// `None` entries make the position read fail.
    pub holdings: Mutex<VecDeque<Option<u64>>>,
    /// Reported position count. The scripted token sits on the last page.
    pub position_total: u64,
    pub calls: Mutex<Vec<String>>,
}

pub fn market(
    market_type: &str,
    virtual_native: u64,
    virtual_token: u64,
    reserve_token: u64,
    reserve_native: u64,
) -> TokenMarket {
    TokenMarket {
        token_address: TOKEN.into(),
        market_address: "0x00000000000000000000000000000000000000cc".into(),
        market_type: market_type.into(),
        price: "0.000002".into(),
        virtual_native: Some(virtual_native.to_string()),
        virtual_token: Some(virtual_token.to_string()),
        reserve_token: Some(reserve_token.to_string()),
        reserve_native: Some(reserve_native.to_string()),
        latest_trade_at: None,
        created_at: 1_700_000_000,
    }
}

pub fn info(is_listing: bool) -> TokenInfo {
    TokenInfo {
        token_address: TOKEN.into(),
        name: "Pepe".into(),
        symbol: "PEPE".into(),
        is_listing: Some(is_listing),
        ..TokenInfo::default()
    }
}

impl FakeMarket {
    pub fn new(markets: Vec<TokenMarket>, infos: Vec<TokenInfo>) -> Self {
        Self {
            markets: Mutex::new(markets.into()),
            infos: Mutex::new(infos.into()),
            holdings: Mutex::new(VecDeque::new()),
            position_total: 1,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_holdings(self, holdings: Vec<Option<u64>>) -> Self {
        *self.holdings.lock().unwrap() = holdings.into();
        self
    }

    pub fn with_position_total(mut self, total: u64) -> Self {
        self.position_total = total;
        self
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    pub fn position_reads(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == "account_positions")
            .count()
    }
}

fn unscripted(what: &str) -> TradingError {
    TradingError::MarketDataUnavailable(format!("{what} not scripted"))
}

#[async_trait]
impl MarketDataSource for FakeMarket {
    async fn account_positions(
        &self,
        account: &str,
        _filter: PositionFilter,
        page: u32,
        limit: u32,
    ) -> Result<AccountPositions, TradingError> {
        self.record("account_positions");
        let last_page = self.position_total.div_ceil(u64::from(limit)).max(1);
        if u64::from(page) < last_page {
            return Ok(AccountPositions {
                account_address: account.to_string(),
                positions: vec![PositionEntry {
                    token: TokenSummary {
                        token_address: "0x00000000000000000000000000000000000000ee".into(),
                        ..TokenSummary::default()
                    },
                    position: Position {
                        current_token_amount: "7".into(),
                        ..Position::default()
                    },
                    market: MarketSummary::default(),
                }],
                total_count: self.position_total,
            });
        }
        let amount = next(&self.holdings)
            .flatten()
            .ok_or_else(|| unscripted("positions"))?;
        Ok(AccountPositions {
            account_address: account.to_string(),
            positions: vec![PositionEntry {
                token: TokenSummary {
                    token_address: TOKEN.into(),
                    ..TokenSummary::default()
                },
                position: Position {
                    current_token_amount: amount.to_string(),
                    ..Position::default()
                },
                market: MarketSummary::default(),
            }],
            total_count: self.position_total,
        })
    }

    async fn account_created_tokens(
        &self,
        _account: &str,
        _page: u32,
        _limit: u32,
    ) -> Result<CreatedTokens, TradingError> {
        self.record("account_created_tokens");
        Err(unscripted("created tokens"))
    }

    async fn tokens_by_order(
        &self,
        _order: TokenOrder,
        _page: u32,
        _limit: u32,
    ) -> Result<OrderedTokens, TradingError> {
        self.record("tokens_by_order");
        Err(unscripted("ordered tokens"))
    }

    async fn token_info(&self, _token: &str) -> Result<TokenInfo, TradingError> {
        self.record("token_info");
        next(&self.infos).ok_or_else(|| unscripted("token info"))
    }

    async fn token_chart(
        &self,
        _token: &str,
        _interval: ChartInterval,
        _base_timestamp: i64,
    ) -> Result<TokenChart, TradingError> {
        self.record("token_chart");
        Err(unscripted("chart"))
    }

    async fn token_swaps(
        &self,
        _token: &str,
        _page: u32,
        _limit: u32,
    ) -> Result<TokenSwaps, TradingError> {
        self.record("token_swaps");
        Err(unscripted("swaps"))
    }

    async fn token_market(&self, _token: &str) -> Result<TokenMarket, TradingError> {
        self.record("token_market");
        next(&self.markets).ok_or_else(|| unscripted("market"))
    }

    async fn token_holders(
        &self,
        _token: &str,
        _page: u32,
        _limit: u32,
    ) -> Result<TokenHolders, TradingError> {
        self.record("token_holders");
        Err(unscripted("holders"))
    }
}

// ── Chain ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCall {
    NativeBalance(Address),
    TokenBalance(Address, Address),
    AmountsOut(U256, Vec<Address>),
    Send(TxCall),
    WaitReceipt(String),
}

pub struct FakeChain {
    pub native_balance: U256,
    pub token_balance: U256,
    pub amounts_out: Vec<U256>,
    /// Receipt status per submitted transaction, in order.
    pub receipts: Mutex<VecDeque<bool>>,
    pub send_error: Option<String>,
    pub calls: Mutex<Vec<ChainCall>>,
    pub tx_count: Mutex<u64>,
}

impl Default for FakeChain {
    fn default() -> Self {
        Self {
            native_balance: U256::from(10u64).pow(U256::from(21)),
            token_balance: U256::from(10u64).pow(U256::from(21)),
            amounts_out: vec![],
            receipts: Mutex::new(VecDeque::from([true])),
            send_error: None,
            calls: Mutex::new(Vec::new()),
            tx_count: Mutex::new(0),
        }
    }
}

impl FakeChain {
    pub fn calls(&self) -> Vec<ChainCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<TxCall> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ChainCall::Send(tx) => Some(tx),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ChainCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_hash(&self) -> String {
        let mut n = self.tx_count.lock().unwrap();
        *n += 1;
        format!("0x{:064x}", *n)
    }
}

#[async_trait]
impl ChainGateway for FakeChain {
    async fn native_balance(&self, account: Address) -> Result<U256, TradingError> {
        self.record(ChainCall::NativeBalance(account));
        Ok(self.native_balance)
    }

    async fn token_balance(&self, token: Address, account: Address) -> Result<U256, TradingError> {
        self.record(ChainCall::TokenBalance(token, account));
        Ok(self.token_balance)
    }

    async fn amounts_out(
        &self,
        _router: Address,
        amount_in: U256,
        path: Vec<Address>,
    ) -> Result<Vec<U256>, TradingError> {
        self.record(ChainCall::AmountsOut(amount_in, path));
        Ok(self.amounts_out.clone())
    }

    async fn send_with_key(&self, _key: &SecretString, call: TxCall) -> Result<String, TradingError> {
        self.record(ChainCall::Send(call));
        if let Some(msg) = &self.send_error {
            return Err(TradingError::Chain(msg.clone()));
        }
        Ok(self.next_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TxReceipt, TradingError> {
        self.record(ChainCall::WaitReceipt(tx_hash.to_string()));
        let succeeded = next(&self.receipts).unwrap_or(true);
        Ok(TxReceipt {
            tx_hash: tx_hash.to_string(),
            succeeded,
            block_number: Some(1),
            gas_used: 100_000,
        })
    }
}

/// Custodial wallet that broadcasts through the fake chain's call log.
pub struct FakeWallet {
    pub chain: Arc<FakeChain>,
    pub sends: Mutex<Vec<(String, TxCall)>>,
}

#[async_trait]
impl CustodialWallet for FakeWallet {
    async fn create_wallet(&self) -> Result<CreatedWallet, TradingError> {
        Ok(CreatedWallet {
            id: "wallet-1".into(),
            address: "0x00000000000000000000000000000000000000aa".into(),
        })
    }

    async fn send_transaction(&self, wallet_id: &str, call: TxCall) -> Result<String, TradingError> {
        self.sends
            .lock()
            .unwrap()
            .push((wallet_id.to_string(), call));
        Ok(self.chain.next_hash())
    }
}

pub fn test_config() -> TradingConfig {
    TradingConfig {
        settle_delay: Duration::ZERO,
        ..TradingConfig::default()
    }
}

pub struct Harness {
    pub market: Arc<FakeMarket>,
    pub chain: Arc<FakeChain>,
    pub wallet: Arc<FakeWallet>,
    pub executor: TradeExecutor,
}

pub fn harness(market: FakeMarket, chain: FakeChain) -> Harness {
    let market = Arc::new(market);
    let chain = Arc::new(chain);
    let wallet = Arc::new(FakeWallet {
        chain: chain.clone(),
        sends: Mutex::new(Vec::new()),
    });
    let executor = TradeExecutor::new(test_config(), market.clone(), chain.clone(), wallet.clone());
    Harness {
        market,
        chain,
        wallet,
        executor,
    }
}
