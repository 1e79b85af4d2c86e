//! Chain access: balance reads, router quotes, locally signed submission and
//! receipt polling.

use std::time::Duration;

use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::TradingConfig;
use crate::contracts::{IToken, IUniswapV2Router};
use crate::error::TradingError;

/// An unsigned contract call or value transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub succeeded: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

#[async_trait]
pub trait ChainGateway: Send + Sync {
    async fn native_balance(&self, account: Address) -> Result<U256, TradingError>;

    async fn token_balance(&self, token: Address, account: Address) -> Result<U256, TradingError>;

    /// Router `getAmountsOut` along `path`.
    async fn amounts_out(
        &self,
        router: Address,
        amount_in: U256,
        path: Vec<Address>,
    ) -> Result<Vec<U256>, TradingError>;

    /// Sign `call` with `key` and broadcast it. Returns the transaction hash.
    async fn send_with_key(&self, key: &SecretString, call: TxCall) -> Result<String, TradingError>;

    /// Poll until the receipt is available. A timeout leaves the outcome
    /// unknown; the transaction may still be included later.
    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TxReceipt, TradingError>;
}

pub struct RpcChainGateway {
    provider: DynProvider,
    rpc_url: url::Url,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl RpcChainGateway {
    pub fn new(config: &TradingConfig) -> Result<Self, TradingError> {
        let rpc_url: url::Url = config
            .rpc_url
            .parse()
            .map_err(|e| TradingError::ConfigError(format!("Invalid RPC URL: {e}")))?;

        let provider = ProviderBuilder::new()
            .connect_http(rpc_url.clone())
            .erased();

        Ok(Self {
            provider,
            rpc_url,
            receipt_timeout: config.receipt_timeout,
            poll_interval: config.receipt_poll_interval,
        })
    }
}

fn chain_err(e: impl std::fmt::Display) -> TradingError {
    TradingError::Chain(e.to_string())
}

#[async_trait]
impl ChainGateway for RpcChainGateway {
    async fn native_balance(&self, account: Address) -> Result<U256, TradingError> {
        self.provider.get_balance(account).await.map_err(chain_err)
    }

    async fn token_balance(&self, token: Address, account: Address) -> Result<U256, TradingError> {
        IToken::new(token, &self.provider)
            .balanceOf(account)
            .call()
            .await
            .map_err(chain_err)
    }

    async fn amounts_out(
        &self,
        router: Address,
        amount_in: U256,
        path: Vec<Address>,
    ) -> Result<Vec<U256>, TradingError> {
        IUniswapV2Router::new(router, &self.provider)
            .getAmountsOut(amount_in, path)
            .call()
            .await
            .map_err(chain_err)
    }

    async fn send_with_key(&self, key: &SecretString, call: TxCall) -> Result<String, TradingError> {
        let signer: PrivateKeySigner = key
            .expose_secret()
            .parse()
            .map_err(|_| TradingError::InvalidArgument("malformed private key".into()))?;
        let from = signer.address();

        // Signing provider lives for this call only.
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(self.rpc_url.clone());

        let tx = TransactionRequest::default()
            .from(from)
            .to(call.to)
            .input(call.data.into())
            .value(call.value)
            .gas_limit(call.gas_limit);

        let pending = provider.send_transaction(tx).await.map_err(chain_err)?;
        let tx_hash = format!("0x{}", hex::encode(pending.tx_hash().as_slice()));
        tracing::info!(%from, to = %call.to, %tx_hash, "Transaction broadcast");
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TxReceipt, TradingError> {
        let hash: B256 = tx_hash
            .parse()
            .map_err(|e| TradingError::InvalidArgument(format!("invalid tx hash {tx_hash}: {e}")))?;
        let started = tokio::time::Instant::now();

        loop {
            match self.provider.get_transaction_receipt(hash).await {
                Ok(Some(receipt)) => {
                    return Ok(TxReceipt {
                        tx_hash: tx_hash.to_string(),
                        succeeded: receipt.status(),
                        block_number: receipt.block_number(),
                        gas_used: receipt.gas_used(),
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(%tx_hash, error = %e, "Receipt poll failed, retrying");
                }
            }
            if started.elapsed() >= self.receipt_timeout {
                return Err(TradingError::ReceiptTimeout {
                    tx_hash: tx_hash.to_string(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rpc_url: &str) -> TradingConfig {
        TradingConfig {
            rpc_url: rpc_url.to_string(),
            receipt_timeout: Duration::from_millis(50),
            receipt_poll_interval: Duration::from_millis(10),
            ..TradingConfig::default()
        }
    }

    #[test]
    fn test_gateway_creation() {
        assert!(RpcChainGateway::new(&config("http://localhost:8545")).is_ok());
    }

    #[test]
    fn test_invalid_rpc_url() {
        assert!(matches!(
            RpcChainGateway::new(&config("not a url")),
            Err(TradingError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_key_rejected_before_network() {
        let gateway = RpcChainGateway::new(&config("http://127.0.0.1:1")).unwrap();
        let call = TxCall {
            to: Address::ZERO,
            data: Bytes::new(),
            value: U256::ZERO,
            gas_limit: 21_000,
        };
        let err = gateway
            .send_with_key(&SecretString::from("not-a-key"), call)
            .await
            .unwrap_err();
        assert!(matches!(err, TradingError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_receipt_timeout_when_node_unreachable() {
        let gateway = RpcChainGateway::new(&config("http://127.0.0.1:1")).unwrap();
        let hash = format!("0x{}", "ab".repeat(32));
        let err = gateway.wait_for_receipt(&hash).await.unwrap_err();
        assert!(matches!(err, TradingError::ReceiptTimeout { .. }));
        assert!(!err.is_retryable());
    }
}
