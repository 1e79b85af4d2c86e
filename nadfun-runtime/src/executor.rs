//! Trade execution pipeline.
//!
//! Each call runs `Validating → PhaseChecked → Priced → Submitted →
//! Confirmed → Reconciled`, failing out at any stage with a typed
//! `TradingError`. Market state is re-read on every call; the chain is the
//! only arbiter of concurrent trades against the same token.
//!
//! Dropping a call's future after broadcast abandons only the receipt wait.
//! The transaction itself cannot be recalled.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;

use crate::chain::{ChainGateway, TxCall, TxReceipt};
use crate::config::TradingConfig;
use crate::contracts::{ICore, IToken, IUniswapV2Router};
use crate::error::TradingError;
use crate::identity::Identity;
use crate::market_data::{MarketDataSource, PositionFilter};
use crate::phase::{PhaseResolver, available_supply};
use crate::pricing;
use crate::types::{Direction, MarketPhase, TradeIntent, TradeMode, TradeResult, TransferResult};
use crate::units::{format_amount, parse_address, parse_amount};
use crate::wallet::CustodialWallet;

pub const NATIVE_TRANSFER_GAS: u64 = 21_000;
const SNAPSHOT_PAGE_LIMIT: u32 = 100;
const SNAPSHOT_MAX_PAGES: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    PhaseChecked,
    Priced,
    Submitted,
    Confirmed,
    Reconciled,
}

pub struct TradeExecutor {
    config: TradingConfig,
    phases: PhaseResolver,
    market: Arc<dyn MarketDataSource>,
    chain: Arc<dyn ChainGateway>,
    wallet: Arc<dyn CustodialWallet>,
}

impl TradeExecutor {
    pub fn new(
        config: TradingConfig,
        market: Arc<dyn MarketDataSource>,
        chain: Arc<dyn ChainGateway>,
        wallet: Arc<dyn CustodialWallet>,
    ) -> Self {
        Self {
            config,
            phases: PhaseResolver::new(market.clone()),
            market,
            chain,
            wallet,
        }
    }

    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    pub fn phases(&self) -> &PhaseResolver {
        &self.phases
    }

    pub fn chain(&self) -> &Arc<dyn ChainGateway> {
        &self.chain
    }

    /// Dispatch an intent to the operation for its venue, direction and mode.
    pub async fn execute(&self, intent: &TradeIntent) -> Result<TradeResult, TradingError> {
        let token = intent.token_address.as_str();
        let amount = intent.amount.as_str();
        let signer = &intent.signer;
        match (intent.venue, intent.direction, intent.mode) {
            (MarketPhase::Curve, Direction::Buy, TradeMode::ExactIn) => {
                self.buy_exact_in(token, amount, signer).await
            }
            (MarketPhase::Curve, Direction::Buy, TradeMode::ExactOut) => {
                self.buy_exact_out(token, amount, signer).await
            }
            (MarketPhase::Dex, Direction::Buy, TradeMode::ExactIn) => {
                self.buy_from_dex(token, amount, intent.slippage_bps, signer)
                    .await
            }
            (MarketPhase::Dex, Direction::Sell, TradeMode::ExactIn) => {
                self.sell_to_dex(token, amount, intent.slippage_bps, signer)
                    .await
            }
            (MarketPhase::Curve, Direction::Sell, _) => Err(TradingError::InvalidArgument(
                "selling back to the bonding curve is not supported".into(),
            )),
            (MarketPhase::Dex, _, TradeMode::ExactOut) => Err(TradingError::InvalidArgument(
                "exact-out trades are only available on the bonding curve".into(),
            )),
        }
    }

    /// Spend `amount` MON on the bonding curve.
    pub async fn buy_exact_in(
        &self,
        token: &str,
        amount: &str,
        identity: &Identity,
    ) -> Result<TradeResult, TradingError> {
        let result = self.try_buy_exact_in(token, amount, identity).await;
        log_outcome("buy_exact_in", token, &result);
        result
    }

    async fn try_buy_exact_in(
        &self,
        token: &str,
        amount: &str,
        identity: &Identity,
    ) -> Result<TradeResult, TradingError> {
        let op = "buy_exact_in";
        stage(op, token, Stage::Validating);
        let amount_in = parse_amount(amount)?;
        let token_address = parse_address(token)?;
        let account = identity.address()?;

        let state = self.phases.assert_phase(token, MarketPhase::Curve).await?;
        stage(op, token, Stage::PhaseChecked);

        let available = available_supply(&state);
        if available.is_zero() {
            return Err(TradingError::SoldOut);
        }
        let estimated_out =
            pricing::quote_exact_in(state.virtual_native, state.virtual_token, amount_in)?;
        if estimated_out > available {
            return Err(TradingError::ExceedsAvailableSupply {
                requested: format_amount(estimated_out),
                available: format_amount(available),
            });
        }
        let fee = pricing::with_fee(amount_in, self.config.fee_bps);
        stage(op, token, Stage::Priced);

        self.ensure_native_balance(account, fee.total).await?;
        let before = self.snapshot(account, token_address).await;

        let data = ICore::buyCall {
            amountIn: amount_in,
            fee: fee.fee,
            tokenAddress: token_address,
            to: account,
            deadline: self.deadline(),
        }
        .abi_encode();
        let call = self.contract_call(self.config.core_address, data, fee.total);
        let receipt = self.submit_and_confirm(op, token, identity, call).await?;

        let observed = self.reconcile(account, token_address, before).await;
        stage(op, token, Stage::Reconciled);

        let mut result = TradeResult::submitted(receipt.tx_hash);
        result.estimated_out = Some(estimated_out);
        result.total_value = Some(fee.total);
        result.set_observed(observed);
        result.message = format!(
            "Bought ~{} tokens for {} MON (fee {} MON)",
            format_amount(result.effective_out().unwrap_or(estimated_out)),
            format_amount(amount_in),
            format_amount(fee.fee),
        );
        Ok(result)
    }

    /// Buy exactly `tokens_out` tokens from the bonding curve.
    pub async fn buy_exact_out(
        &self,
        token: &str,
        tokens_out: &str,
        identity: &Identity,
    ) -> Result<TradeResult, TradingError> {
        let result = self.try_buy_exact_out(token, tokens_out, identity).await;
        log_outcome("buy_exact_out", token, &result);
        result
    }

    async fn try_buy_exact_out(
        &self,
        token: &str,
        tokens_out: &str,
        identity: &Identity,
    ) -> Result<TradeResult, TradingError> {
        let op = "buy_exact_out";
        stage(op, token, Stage::Validating);
        let tokens_out = parse_amount(tokens_out)?;
        let token_address = parse_address(token)?;
        let account = identity.address()?;

        let state = self.phases.assert_phase(token, MarketPhase::Curve).await?;
        stage(op, token, Stage::PhaseChecked);

        let available = available_supply(&state);
        if available.is_zero() {
            return Err(TradingError::SoldOut);
        }
        if tokens_out > available {
            return Err(TradingError::ExceedsAvailableSupply {
                requested: format_amount(tokens_out),
                available: format_amount(available),
            });
        }
        let triggers_listing = tokens_out >= available;

        let required = pricing::amount_in_for_exact_out(
            state.virtual_native,
            state.virtual_token,
            tokens_out,
        )?;
        let max_native_in = pricing::with_buffer(required, self.config.exact_out_buffer_bps);
        let fee = pricing::with_fee(max_native_in, self.config.fee_bps);
        stage(op, token, Stage::Priced);

        self.ensure_native_balance(account, fee.total).await?;
        let before = self.snapshot(account, token_address).await;

        let data = ICore::exactOutBuyCall {
            tokensOut: tokens_out,
            maxNativeIn: max_native_in,
            fee: fee.fee,
            tokenAddress: token_address,
            to: account,
            deadline: self.deadline(),
        }
        .abi_encode();
        let call = self.contract_call(self.config.core_address, data, fee.total);
        let receipt = self.submit_and_confirm(op, token, identity, call).await?;

        let observed = self.reconcile(account, token_address, before).await;
        stage(op, token, Stage::Reconciled);

        let mut result = TradeResult::submitted(receipt.tx_hash);
        result.estimated_out = Some(tokens_out);
        result.total_value = Some(fee.total);
        result.triggers_listing = triggers_listing;
        result.set_observed(observed);
        result.message = format!(
            "Bought {} tokens for at most {} MON (fee {} MON)",
            format_amount(tokens_out),
            format_amount(max_native_in),
            format_amount(fee.fee),
        );
        if triggers_listing {
            result
                .message
                .push_str("; this purchase exhausts the curve and lists the token on the DEX");
        }
        Ok(result)
    }

    /// Swap `amount` MON for tokens on the DEX router.
    pub async fn buy_from_dex(
        &self,
        token: &str,
        amount: &str,
        slippage_bps: Option<u32>,
        identity: &Identity,
    ) -> Result<TradeResult, TradingError> {
        let result = self.try_buy_from_dex(token, amount, slippage_bps, identity).await;
        log_outcome("buy_from_dex", token, &result);
        result
    }

    async fn try_buy_from_dex(
        &self,
        token: &str,
        amount: &str,
        slippage_bps: Option<u32>,
        identity: &Identity,
    ) -> Result<TradeResult, TradingError> {
        let op = "buy_from_dex";
        stage(op, token, Stage::Validating);
        let amount_in = parse_amount(amount)?;
        let token_address = parse_address(token)?;
        let slippage = self.slippage(slippage_bps)?;
        let account = identity.address()?;

        self.phases.assert_listed(token).await?;
        stage(op, token, Stage::PhaseChecked);

        let path = vec![self.config.wrapped_native_address, token_address];
        let expected_out = self.quote_router(amount_in, path.clone()).await?;
        let min_out = pricing::apply_slippage(expected_out, slippage)?;
        stage(op, token, Stage::Priced);

        self.ensure_native_balance(account, amount_in).await?;
        let before = self.snapshot(account, token_address).await;

        let data = IUniswapV2Router::swapExactNativeForTokensCall {
            amountOutMin: min_out,
            path,
            to: account,
            deadline: self.deadline(),
        }
        .abi_encode();
        let call = self.contract_call(self.config.router_address, data, amount_in);
        let receipt = self.submit_and_confirm(op, token, identity, call).await?;

        let observed = self.reconcile(account, token_address, before).await;
        stage(op, token, Stage::Reconciled);

        let mut result = TradeResult::submitted(receipt.tx_hash);
        result.estimated_out = Some(expected_out);
        result.total_value = Some(amount_in);
        result.set_observed(observed);
        result.message = format!(
            "Swapped {} MON for ~{} tokens (minimum {})",
            format_amount(amount_in),
            format_amount(result.effective_out().unwrap_or(expected_out)),
            format_amount(min_out),
        );
        Ok(result)
    }

    /// Sell `amount` tokens for MON on the DEX router. The router approval
    /// must be confirmed before the swap is sent.
    pub async fn sell_to_dex(
        &self,
        token: &str,
        amount: &str,
        slippage_bps: Option<u32>,
        identity: &Identity,
    ) -> Result<TradeResult, TradingError> {
        let result = self.try_sell_to_dex(token, amount, slippage_bps, identity).await;
        log_outcome("sell_to_dex", token, &result);
        result
    }

    async fn try_sell_to_dex(
        &self,
        token: &str,
        amount: &str,
        slippage_bps: Option<u32>,
        identity: &Identity,
    ) -> Result<TradeResult, TradingError> {
        let op = "sell_to_dex";
        stage(op, token, Stage::Validating);
        let amount_in = parse_amount(amount)?;
        let token_address = parse_address(token)?;
        let slippage = self.slippage(slippage_bps)?;
        let account = identity.address()?;

        self.phases.assert_listed(token).await?;
        stage(op, token, Stage::PhaseChecked);

        let held = self.chain.token_balance(token_address, account).await?;
        if held < amount_in {
            return Err(TradingError::InsufficientBalance {
                have: format_amount(held),
                need: format_amount(amount_in),
            });
        }

        let approve = IToken::approveCall {
            spender: self.config.router_address,
            amount: amount_in,
        }
        .abi_encode();
        let approve_call = self.contract_call(token_address, approve, U256::ZERO);
        let approval = self
            .submit_and_confirm("approve", token, identity, approve_call)
            .await
            .map_err(|e| match e {
                TradingError::InsufficientBalance { .. } => e,
                other => TradingError::ApprovalFailed(other.to_string()),
            })?;

        let path = vec![token_address, self.config.wrapped_native_address];
        let expected_out = self.quote_router(amount_in, path.clone()).await?;
        let min_out = pricing::apply_slippage(expected_out, slippage)?;
        stage(op, token, Stage::Priced);

        let data = IUniswapV2Router::swapExactTokensForNativeCall {
            amountIn: amount_in,
            amountOutMin: min_out,
            path,
            to: account,
            deadline: self.deadline(),
        }
        .abi_encode();
        let call = self.contract_call(self.config.router_address, data, U256::ZERO);
        let receipt = self.submit_and_confirm(op, token, identity, call).await?;

        let mut result = TradeResult::submitted(receipt.tx_hash);
        result.estimated_out = Some(expected_out);
        result.approval_tx_hash = Some(approval.tx_hash);
        result.message = format!(
            "Sold {} tokens for ~{} MON (minimum {})",
            format_amount(amount_in),
            format_amount(expected_out),
            format_amount(min_out),
        );
        Ok(result)
    }

    /// Send `amount` MON to `to`.
    pub async fn transfer_native(
        &self,
        to: &str,
        amount: &str,
        identity: &Identity,
    ) -> Result<TransferResult, TradingError> {
        let value = parse_amount(amount)?;
        let recipient = parse_address(to)?;
        let from = identity.address()?;

        self.ensure_native_balance(from, value).await?;

        let call = TxCall {
            to: recipient,
            data: Bytes::new(),
            value,
            gas_limit: NATIVE_TRANSFER_GAS,
        };
        let receipt = self.submit_and_confirm("transfer", to, identity, call).await?;
        tracing::info!(%from, to = %recipient, amount = %format_amount(value), tx_hash = %receipt.tx_hash, "Native transfer confirmed");

        Ok(TransferResult {
            tx_hash: receipt.tx_hash,
            from,
            to: recipient,
            amount: value,
        })
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    fn deadline(&self) -> U256 {
        let at = chrono::Utc::now().timestamp() + self.config.deadline_secs;
        U256::from(at.max(0) as u64)
    }

    fn slippage(&self, requested: Option<u32>) -> Result<u32, TradingError> {
        let bps = requested.unwrap_or(self.config.default_slippage_bps);
        if bps > pricing::BPS_DENOMINATOR as u32 {
            return Err(TradingError::InvalidArgument(format!(
                "slippage {bps} bps exceeds 10000"
            )));
        }
        Ok(bps)
    }

    fn contract_call(&self, to: Address, data: Vec<u8>, value: U256) -> TxCall {
        TxCall {
            to,
            data: Bytes::from(data),
            value,
            gas_limit: self.config.gas_limit,
        }
    }

    async fn quote_router(&self, amount_in: U256, path: Vec<Address>) -> Result<U256, TradingError> {
        let amounts = self
            .chain
            .amounts_out(self.config.router_address, amount_in, path)
            .await?;
        amounts
            .last()
            .copied()
            .ok_or_else(|| TradingError::Chain("router returned no amounts".into()))
    }

    async fn ensure_native_balance(&self, account: Address, need: U256) -> Result<(), TradingError> {
        let have = self.chain.native_balance(account).await?;
        if have < need {
            return Err(TradingError::InsufficientBalance {
                have: format_amount(have),
                need: format_amount(need),
            });
        }
        Ok(())
    }

    async fn submit(&self, identity: &Identity, call: TxCall) -> Result<String, TradingError> {
        let need = call.value;
        let sent = match identity {
            Identity::SuppliedKey { raw_key } => self.chain.send_with_key(raw_key, call).await,
            Identity::SessionWallet { wallet_id, .. } => {
                self.wallet.send_transaction(wallet_id, call).await
            }
        };
        sent.map_err(|e| classify_submit_error(e, need))
    }

    async fn submit_and_confirm(
        &self,
        op: &str,
        token: &str,
        identity: &Identity,
        call: TxCall,
    ) -> Result<TxReceipt, TradingError> {
        let tx_hash = self.submit(identity, call).await?;
        stage(op, token, Stage::Submitted);
        tracing::info!(%op, %token, %tx_hash, signer = identity.kind(), "Transaction submitted");

        let receipt = self.chain.wait_for_receipt(&tx_hash).await?;
        if !receipt.succeeded {
            return Err(TradingError::TransactionReverted { tx_hash });
        }
        stage(op, token, Stage::Confirmed);
        Ok(receipt)
    }

    /// Best-effort position read. `None` means the baseline is unknown.
    async fn snapshot(&self, account: Address, token: Address) -> Option<U256> {
        match self.read_holding(account, token).await {
            Ok(amount) => Some(amount),
            Err(e) => {
                tracing::warn!(%account, %token, error = %e, "Position snapshot unavailable");
                None
            }
        }
    }

    /// Page through the account's positions until `token` turns up. A token
    /// missing from every page is a zero holding.
    async fn read_holding(&self, account: Address, token: Address) -> Result<U256, TradingError> {
        let owner = account.to_string();
        for page in 1..=SNAPSHOT_MAX_PAGES {
            let positions = self
                .market
                .account_positions(&owner, PositionFilter::All, page, SNAPSHOT_PAGE_LIMIT)
                .await?;
            if let Some(amount) = positions.holding_of(token)? {
                return Ok(amount);
            }
            let seen = u64::from(page) * u64::from(SNAPSHOT_PAGE_LIMIT);
            if positions.positions.is_empty() || seen >= positions.total_count {
                return Ok(U256::ZERO);
            }
        }
        Err(TradingError::MarketDataUnavailable(format!(
            "position for {token} not found within {SNAPSHOT_MAX_PAGES} pages"
        )))
    }

    async fn reconcile(&self, account: Address, token: Address, before: Option<U256>) -> Option<U256> {
        let before = before?;
        tokio::time::sleep(self.config.settle_delay).await;
        let after = self.snapshot(account, token).await?;
        let delta = after.checked_sub(before);
        if delta.is_none() {
            tracing::warn!(%account, %token, "Position shrank across a buy, indexer likely stale");
        }
        delta
    }
}

impl TradeResult {
    fn set_observed(&mut self, observed: Option<U256>) {
        self.reconciled = observed.is_some();
        self.observed_out = observed;
    }
}

/// Map provider "insufficient funds" failures onto the balance error.
fn classify_submit_error(e: TradingError, need: U256) -> TradingError {
    if let TradingError::Chain(msg) | TradingError::WalletProvider(msg) = &e {
        let lower = msg.to_lowercase();
        if lower.contains("insufficient funds") || lower.contains("insufficient balance") {
            return TradingError::InsufficientBalance {
                have: "unknown".into(),
                need: format_amount(need),
            };
        }
    }
    e
}

fn stage(op: &str, token: &str, stage: Stage) {
    tracing::debug!(%op, %token, stage = ?stage, "Trade stage");
}

fn log_outcome<T>(op: &str, token: &str, result: &Result<T, TradingError>) {
    if let Err(e) = result {
        tracing::warn!(%op, %token, category = ?e.category(), error = %e, "Trade rejected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_insufficient_funds() {
        let e = classify_submit_error(
            TradingError::Chain("server returned an error: insufficient funds for gas * price + value".into()),
            U256::from(10u64),
        );
        assert!(matches!(e, TradingError::InsufficientBalance { .. }));

        let e = classify_submit_error(
            TradingError::WalletProvider("400: Insufficient balance".into()),
            U256::ZERO,
        );
        assert!(matches!(e, TradingError::InsufficientBalance { .. }));
    }

    #[test]
    fn test_classify_passthrough() {
        let e = classify_submit_error(TradingError::Chain("nonce too low".into()), U256::ZERO);
        assert!(matches!(e, TradingError::Chain(_)));
    }
}
