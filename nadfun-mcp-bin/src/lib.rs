//! Service wiring shared by the stdio and SSE entry points.

use std::sync::Arc;

use nadfun_mcp::NadfunTools;
use nadfun_runtime::chain::RpcChainGateway;
use nadfun_runtime::market_data::NadfunApiClient;
use nadfun_runtime::session::{InMemorySessionStore, RedisSessionStore, SessionStore};
use nadfun_runtime::wallet::{CustodialWallet, DisabledWallet, PrivyWalletClient};
use nadfun_runtime::{
    IdentityResolver, MarketDataConfig, TradeExecutor, TradingConfig, TradingError,
    WalletProviderConfig,
};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] TradingError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct Services {
    pub tools: Arc<NadfunTools>,
    pub sessions: Arc<dyn SessionStore>,
    pub wallet: Arc<dyn CustodialWallet>,
}

pub fn build_services(
    trading: TradingConfig,
    market: &MarketDataConfig,
    wallet: Option<WalletProviderConfig>,
    redis_url: Option<&str>,
) -> Result<Services, TradingError> {
    let market: Arc<NadfunApiClient> = Arc::new(NadfunApiClient::new(market)?);
    let chain = Arc::new(RpcChainGateway::new(&trading)?);

    let wallet: Arc<dyn CustodialWallet> = match wallet {
        Some(cfg) => Arc::new(PrivyWalletClient::new(cfg)),
        None => {
            tracing::warn!("PRIVY_APP_ID/PRIVY_APP_SECRET not set, custodial wallets disabled");
            Arc::new(DisabledWallet)
        }
    };
    let sessions: Arc<dyn SessionStore> = match redis_url {
        Some(url) => Arc::new(RedisSessionStore::new(url)?),
        None => {
            tracing::warn!("REDIS_URL not set, sessions kept in memory");
            Arc::new(InMemorySessionStore::new())
        }
    };

    tracing::info!(
        chain_id = trading.chain_id,
        core = %trading.core_address,
        router = %trading.router_address,
        "Trading runtime configured"
    );
    let executor = Arc::new(TradeExecutor::new(
        trading,
        market.clone(),
        chain,
        wallet.clone(),
    ));
    let tools = Arc::new(NadfunTools::new(
        market,
        executor,
        IdentityResolver::new(sessions.clone()),
    ));
    Ok(Services {
        tools,
        sessions,
        wallet,
    })
}
