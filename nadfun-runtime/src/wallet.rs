//! Custodial wallet provider client. Keys live at the provider; this process
//! only ever holds wallet ids.

use alloy::primitives::U256;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::chain::TxCall;
use crate::config::WalletProviderConfig;
use crate::error::TradingError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedWallet {
    pub id: String,
    pub address: String,
}

#[async_trait]
pub trait CustodialWallet: Send + Sync {
    async fn create_wallet(&self) -> Result<CreatedWallet, TradingError>;

    /// Sign and broadcast `call` from the custodial wallet. Returns the
    /// transaction hash.
    async fn send_transaction(&self, wallet_id: &str, call: TxCall) -> Result<String, TradingError>;
}

/// Stand-in used when no provider credentials are configured.
pub struct DisabledWallet;

#[async_trait]
impl CustodialWallet for DisabledWallet {
    async fn create_wallet(&self) -> Result<CreatedWallet, TradingError> {
        Err(TradingError::WalletProvider(
            "custodial wallet provider not configured".into(),
        ))
    }

    async fn send_transaction(&self, _wallet_id: &str, _call: TxCall) -> Result<String, TradingError> {
        Err(TradingError::WalletProvider(
            "custodial wallet provider not configured".into(),
        ))
    }
}

pub struct PrivyWalletClient {
    config: WalletProviderConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    data: RpcData,
}

#[derive(Debug, Deserialize)]
struct RpcData {
    hash: String,
}

fn hex_quantity(v: U256) -> String {
    format!("0x{v:x}")
}

impl PrivyWalletClient {
    pub fn new(config: WalletProviderConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.config.api_url, path))
            .basic_auth(
                &self.config.app_id,
                Some(self.config.app_secret.expose_secret()),
            )
            .header("privy-app-id", &self.config.app_id)
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        body: serde_json::Value,
    ) -> Result<T, TradingError> {
        let resp = req
            .json(&body)
            .send()
            .await
            .map_err(|e| TradingError::WalletProvider(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(TradingError::WalletProvider(format!("{status}: {text}")));
        }
        resp.json()
            .await
            .map_err(|e| TradingError::WalletProvider(format!("unexpected response: {e}")))
    }
}

#[async_trait]
impl CustodialWallet for PrivyWalletClient {
    async fn create_wallet(&self) -> Result<CreatedWallet, TradingError> {
        let wallet: CreatedWallet = self
            .send_json(
                self.post("/v1/wallets"),
                serde_json::json!({ "chain_type": "ethereum" }),
            )
            .await?;
        tracing::info!(wallet_id = %wallet.id, address = %wallet.address, "Custodial wallet created");
        Ok(wallet)
    }

    async fn send_transaction(&self, wallet_id: &str, call: TxCall) -> Result<String, TradingError> {
        let body = serde_json::json!({
            "method": "eth_sendTransaction",
            "caip2": format!("eip155:{}", self.config.chain_id),
            "params": {
                "transaction": {
                    "to": call.to.to_string(),
                    "value": hex_quantity(call.value),
                    "data": call.data.to_string(),
                    "gas_limit": format!("0x{:x}", call.gas_limit),
                }
            }
        });
        let resp: RpcResponse = self
            .send_json(self.post(&format!("/v1/wallets/{wallet_id}/rpc")), body)
            .await?;
        tracing::info!(%wallet_id, to = %call.to, tx_hash = %resp.data.hash, "Custodial transaction broadcast");
        Ok(resp.data.hash)
    }
}
