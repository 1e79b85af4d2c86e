//! Trade executor flows against scripted market data and chain fakes.

mod common;

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use common::*;
use nadfun_runtime::config::{CORE_ADDRESS, DEX_ROUTER_ADDRESS, WRAPPED_NATIVE_ADDRESS};
use nadfun_runtime::contracts::{ICore, IToken, IUniswapV2Router};
use nadfun_runtime::identity::Identity;
use nadfun_runtime::{
    Direction, ErrorCategory, MarketPhase, TradeIntent, TradeMode, TradingError,
};

fn token() -> Address {
    TOKEN.parse().unwrap()
}

fn key_address() -> Address {
    KEY_ADDRESS.parse().unwrap()
}

/// 100_000 wei expressed in MON.
const AMOUNT_100K_WEI: &str = "0.0000000000001";

// ── Curve buys ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_buy_rejected_when_estimate_exceeds_available_supply() {
    // available = 90_000 - 50_000 = 40_000; estimate = 45_455
    let h = harness(
        FakeMarket::new(vec![market("CURVE", 1_000_000, 500_000, 90_000, 50_000)], vec![info(false)]),
        FakeChain::default(),
    );

    let err = h
        .executor
        .buy_exact_in(TOKEN, AMOUNT_100K_WEI, &supplied_key())
        .await
        .unwrap_err();

    match &err {
        TradingError::ExceedsAvailableSupply { requested, available } => {
            assert_eq!(requested, "0.000000000000045455");
            assert_eq!(available, "0.00000000000004");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.category(), ErrorCategory::StatePrecondition);
    assert!(h.chain.calls().is_empty());
}

#[tokio::test]
async fn test_buy_exact_in_submits_amount_plus_fee_and_reconciles() {
    let h = harness(
        FakeMarket::new(vec![market("CURVE", 1_000_000, 500_000, 1_000_000, 0)], vec![info(false)])
            .with_holdings(vec![Some(0), Some(45_455)]),
        FakeChain::default(),
    );

    let result = h
        .executor
        .buy_exact_in(TOKEN, AMOUNT_100K_WEI, &supplied_key())
        .await
        .unwrap();

    assert!(result.succeeded);
    assert_eq!(result.estimated_out, Some(U256::from(45_455u64)));
    assert_eq!(result.observed_out, Some(U256::from(45_455u64)));
    assert!(result.reconciled);
    assert_eq!(result.total_value, Some(U256::from(101_000u64)));

    let sent = h.chain.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, CORE_ADDRESS);
    assert_eq!(sent[0].value, U256::from(101_000u64));
    assert_eq!(sent[0].gas_limit, 300_000);

    let call = ICore::buyCall::abi_decode(&sent[0].data).unwrap();
    assert_eq!(call.amountIn, U256::from(100_000u64));
    assert_eq!(call.fee, U256::from(1_000u64));
    assert_eq!(call.tokenAddress, token());
    assert_eq!(call.to, key_address());

    let now = chrono::Utc::now().timestamp() as u64;
    let deadline: u64 = call.deadline.to();
    assert!(deadline >= now + 1_190 && deadline <= now + 1_210);
}

#[tokio::test]
async fn test_unavailable_snapshot_reports_estimate() {
    let h = harness(
        FakeMarket::new(vec![market("CURVE", 1_000_000, 500_000, 1_000_000, 0)], vec![info(false)])
            .with_holdings(vec![None]),
        FakeChain::default(),
    );

    let result = h
        .executor
        .buy_exact_in(TOKEN, AMOUNT_100K_WEI, &supplied_key())
        .await
        .unwrap();

    assert!(result.succeeded);
    assert!(!result.reconciled);
    assert_eq!(result.observed_out, None);
    assert_eq!(result.effective_out(), Some(U256::from(45_455u64)));
    // no second read without a baseline
    assert_eq!(h.market.position_reads(), 1);
}

#[tokio::test]
async fn test_snapshot_pages_past_first_hundred_positions() {
    let h = harness(
        FakeMarket::new(vec![market("CURVE", 1_000_000, 500_000, 1_000_000, 0)], vec![info(false)])
            .with_position_total(250)
            .with_holdings(vec![Some(30_000), Some(75_455)]),
        FakeChain::default(),
    );

    let result = h
        .executor
        .buy_exact_in(TOKEN, AMOUNT_100K_WEI, &supplied_key())
        .await
        .unwrap();

    assert!(result.reconciled);
    assert_eq!(result.observed_out, Some(U256::from(45_455u64)));
    // three pages before and three after
    assert_eq!(h.market.position_reads(), 6);
}

#[tokio::test]
async fn test_sold_out_curve() {
    let h = harness(
        FakeMarket::new(vec![market("CURVE", 1_000_000, 500_000, 50_000, 50_000)], vec![info(false)]),
        FakeChain::default(),
    );

    let err = h
        .executor
        .buy_exact_in(TOKEN, "1", &supplied_key())
        .await
        .unwrap_err();
    assert!(matches!(err, TradingError::SoldOut));
    assert!(h.chain.calls().is_empty());
}

#[tokio::test]
async fn test_reverted_buy_is_terminal() {
    let chain = FakeChain::default();
    *chain.receipts.lock().unwrap() = [false].into();
    let h = harness(
        FakeMarket::new(vec![market("CURVE", 1_000_000, 500_000, 1_000_000, 0)], vec![info(false)])
            .with_holdings(vec![Some(0)]),
        chain,
    );

    let err = h
        .executor
        .buy_exact_in(TOKEN, AMOUNT_100K_WEI, &supplied_key())
        .await
        .unwrap_err();
    assert!(matches!(err, TradingError::TransactionReverted { .. }));
    assert!(!err.is_retryable());
    assert_eq!(h.chain.sent().len(), 1);
}

#[tokio::test]
async fn test_preflight_insufficient_balance() {
    let chain = FakeChain {
        native_balance: U256::from(100_999u64),
        ..FakeChain::default()
    };
    let h = harness(
        FakeMarket::new(vec![market("CURVE", 1_000_000, 500_000, 1_000_000, 0)], vec![info(false)]),
        chain,
    );

    let err = h
        .executor
        .buy_exact_in(TOKEN, AMOUNT_100K_WEI, &supplied_key())
        .await
        .unwrap_err();
    assert!(matches!(err, TradingError::InsufficientBalance { .. }));
    assert!(h.chain.sent().is_empty());
}

#[tokio::test]
async fn test_chain_insufficient_funds_maps_to_balance_error() {
    let chain = FakeChain {
        send_error: Some("insufficient funds for gas * price + value".into()),
        ..FakeChain::default()
    };
    let h = harness(
        FakeMarket::new(vec![market("CURVE", 1_000_000, 500_000, 1_000_000, 0)], vec![info(false)])
            .with_holdings(vec![Some(0)]),
        chain,
    );

    let err = h
        .executor
        .buy_exact_in(TOKEN, AMOUNT_100K_WEI, &supplied_key())
        .await
        .unwrap_err();
    assert!(matches!(err, TradingError::InsufficientBalance { .. }));
}

#[tokio::test]
async fn test_invalid_amount_never_reads_market() {
    let h = harness(
        FakeMarket::new(vec![market("CURVE", 1, 1, 1, 0)], vec![info(false)]),
        FakeChain::default(),
    );

    for bad in ["", "-5", "zero", "0"] {
        let err = h
            .executor
            .buy_exact_in(TOKEN, bad, &supplied_key())
            .await
            .unwrap_err();
        assert!(matches!(err, TradingError::InvalidAmount(_)), "{bad}");
    }
    assert!(h.market.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_exact_out_buy_of_remaining_supply_flags_listing() {
    // available = 60_000 - 50_000 = 10_000
    // required = 5e11 / 490_000 - 1_000_000 = 20_408
    // maxNativeIn = 20_408 * 1.05 = 21_428; fee = 214
    let h = harness(
        FakeMarket::new(vec![market("CURVE", 1_000_000, 500_000, 60_000, 50_000)], vec![info(false)])
            .with_holdings(vec![Some(0), Some(10_000)]),
        FakeChain::default(),
    );

    let result = h
        .executor
        .buy_exact_out(TOKEN, "0.00000000000001", &supplied_key())
        .await
        .unwrap();

    assert!(result.triggers_listing);
    assert_eq!(result.estimated_out, Some(U256::from(10_000u64)));
    assert_eq!(result.total_value, Some(U256::from(21_642u64)));

    let sent = h.chain.sent();
    let call = ICore::exactOutBuyCall::abi_decode(&sent[0].data).unwrap();
    assert_eq!(call.tokensOut, U256::from(10_000u64));
    assert_eq!(call.maxNativeIn, U256::from(21_428u64));
    assert_eq!(call.fee, U256::from(214u64));
    assert_eq!(sent[0].value, U256::from(21_642u64));
}

#[tokio::test]
async fn test_exact_out_beyond_available_rejected() {
    let h = harness(
        FakeMarket::new(vec![market("CURVE", 1_000_000, 500_000, 60_000, 50_000)], vec![info(false)]),
        FakeChain::default(),
    );

    let err = h
        .executor
        .buy_exact_out(TOKEN, "0.000000000000010001", &supplied_key())
        .await
        .unwrap_err();
    assert!(matches!(err, TradingError::ExceedsAvailableSupply { .. }));
    assert!(h.chain.calls().is_empty());
}

// ── DEX trades ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sell_to_dex_on_unlisted_token_is_wrong_phase() {
    let h = harness(
        FakeMarket::new(vec![market("CURVE", 1_000_000, 500_000, 90_000, 50_000)], vec![info(false)]),
        FakeChain::default(),
    );

    let err = h
        .executor
        .sell_to_dex(TOKEN, "1", None, &supplied_key())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TradingError::WrongPhase {
            actual: MarketPhase::Curve,
            expected: MarketPhase::Dex
        }
    ));
    assert!(h.chain.calls().is_empty());
}

#[tokio::test]
async fn test_dex_market_type_without_listing_flag_is_wrong_phase() {
    let chain = FakeChain {
        amounts_out: vec![U256::from(1_000u64), U256::from(2_000u64)],
        ..FakeChain::default()
    };
    let h = harness(
        FakeMarket::new(vec![market("DEX", 0, 0, 0, 0)], vec![info(false)]),
        chain,
    );

    let sell = h
        .executor
        .sell_to_dex(TOKEN, "0.000000000000001", None, &supplied_key())
        .await
        .unwrap_err();
    let buy = h
        .executor
        .buy_from_dex(TOKEN, AMOUNT_100K_WEI, None, &supplied_key())
        .await
        .unwrap_err();

    for err in [sell, buy] {
        assert!(matches!(
            err,
            TradingError::WrongPhase {
                actual: MarketPhase::Curve,
                expected: MarketPhase::Dex
            }
        ));
    }
    assert!(h.chain.calls().is_empty());
}

#[tokio::test]
async fn test_dex_trade_surfaces_listing_lookup_failure() {
    let h = harness(
        FakeMarket::new(vec![market("DEX", 0, 0, 0, 0)], vec![]),
        FakeChain::default(),
    );

    let err = h
        .executor
        .sell_to_dex(TOKEN, "0.000000000000001", None, &supplied_key())
        .await
        .unwrap_err();
    assert!(matches!(err, TradingError::MarketDataUnavailable(_)));
    assert!(err.is_retryable());
    assert!(h.chain.calls().is_empty());
}

#[tokio::test]
async fn test_buy_from_curve_on_listed_token_is_wrong_phase() {
    // market_type still CURVE but the listing flag is set
    let h = harness(
        FakeMarket::new(vec![market("CURVE", 1_000_000, 500_000, 90_000, 50_000)], vec![info(true)]),
        FakeChain::default(),
    );

    let err = h
        .executor
        .buy_exact_in(TOKEN, "1", &supplied_key())
        .await
        .unwrap_err();
    assert!(matches!(err, TradingError::WrongPhase { actual: MarketPhase::Dex, .. }));
}

#[tokio::test]
async fn test_buy_from_dex_applies_slippage_to_router_quote() {
    let chain = FakeChain {
        amounts_out: vec![U256::from(100_000u64), U256::from(10_000u64)],
        ..FakeChain::default()
    };
    let h = harness(
        FakeMarket::new(vec![market("DEX", 0, 0, 0, 0)], vec![info(true)])
            .with_holdings(vec![Some(5), Some(10_005)]),
        chain,
    );

    let result = h
        .executor
        .buy_from_dex(TOKEN, AMOUNT_100K_WEI, None, &supplied_key())
        .await
        .unwrap();
    assert_eq!(result.estimated_out, Some(U256::from(10_000u64)));
    assert_eq!(result.observed_out, Some(U256::from(10_000u64)));

    let sent = h.chain.sent();
    assert_eq!(sent[0].to, DEX_ROUTER_ADDRESS);
    assert_eq!(sent[0].value, U256::from(100_000u64));
    let call = IUniswapV2Router::swapExactNativeForTokensCall::abi_decode(&sent[0].data).unwrap();
    assert_eq!(call.amountOutMin, U256::from(9_950u64));
    assert_eq!(call.path, vec![WRAPPED_NATIVE_ADDRESS, token()]);
}

#[tokio::test]
async fn test_sell_waits_for_approval_before_swap() {
    let chain = FakeChain {
        amounts_out: vec![U256::from(1_000u64), U256::from(2_000u64)],
        ..FakeChain::default()
    };
    let h = harness(
        FakeMarket::new(vec![market("DEX", 0, 0, 0, 0)], vec![info(true)]),
        chain,
    );

    let result = h
        .executor
        .sell_to_dex(TOKEN, "0.000000000000001", Some(100), &supplied_key())
        .await
        .unwrap();
    assert!(result.approval_tx_hash.is_some());
    assert_eq!(result.estimated_out, Some(U256::from(2_000u64)));

    let calls = h.chain.calls();
    let kinds: Vec<&str> = calls
        .iter()
        .map(|c| match c {
            ChainCall::NativeBalance(_) => "native_balance",
            ChainCall::TokenBalance(..) => "token_balance",
            ChainCall::AmountsOut(..) => "amounts_out",
            ChainCall::Send(_) => "send",
            ChainCall::WaitReceipt(_) => "wait",
        })
        .collect();
    assert_eq!(
        kinds,
        ["token_balance", "send", "wait", "amounts_out", "send", "wait"]
    );

    let sent = h.chain.sent();
    let approve = IToken::approveCall::abi_decode(&sent[0].data).unwrap();
    assert_eq!(sent[0].to, token());
    assert_eq!(approve.spender, DEX_ROUTER_ADDRESS);
    assert_eq!(approve.amount, U256::from(1_000u64));

    let swap = IUniswapV2Router::swapExactTokensForNativeCall::abi_decode(&sent[1].data).unwrap();
    assert_eq!(swap.amountOutMin, U256::from(1_980u64));
    assert_eq!(swap.path, vec![token(), WRAPPED_NATIVE_ADDRESS]);
}

#[tokio::test]
async fn test_failed_approval_stops_sell() {
    let chain = FakeChain {
        amounts_out: vec![U256::from(1_000u64), U256::from(2_000u64)],
        ..FakeChain::default()
    };
    *chain.receipts.lock().unwrap() = [false, true].into();
    let h = harness(
        FakeMarket::new(vec![market("DEX", 0, 0, 0, 0)], vec![info(true)]),
        chain,
    );

    let err = h
        .executor
        .sell_to_dex(TOKEN, "0.000000000000001", None, &supplied_key())
        .await
        .unwrap_err();
    assert!(matches!(err, TradingError::ApprovalFailed(_)));
    assert_eq!(h.chain.sent().len(), 1);
}

#[tokio::test]
async fn test_sell_more_than_held() {
    let chain = FakeChain {
        token_balance: U256::from(999u64),
        ..FakeChain::default()
    };
    let h = harness(
        FakeMarket::new(vec![market("DEX", 0, 0, 0, 0)], vec![info(true)]),
        chain,
    );

    let err = h
        .executor
        .sell_to_dex(TOKEN, "0.000000000000001", None, &supplied_key())
        .await
        .unwrap_err();
    assert!(matches!(err, TradingError::InsufficientBalance { .. }));
    assert!(h.chain.sent().is_empty());
}

// ── Identity routing and dispatch ───────────────────────────────────────────

#[tokio::test]
async fn test_session_wallet_signs_through_provider() {
    let h = harness(
        FakeMarket::new(vec![market("CURVE", 1_000_000, 500_000, 1_000_000, 0)], vec![info(false)])
            .with_holdings(vec![Some(0), Some(45_455)]),
        FakeChain::default(),
    );
    let identity = Identity::SessionWallet {
        wallet_id: "wallet-1".into(),
        address: "0x00000000000000000000000000000000000000aa".parse().unwrap(),
    };

    let result = h
        .executor
        .buy_exact_in(TOKEN, AMOUNT_100K_WEI, &identity)
        .await
        .unwrap();
    assert!(result.succeeded);
    assert!(h.chain.sent().is_empty());

    let sends = h.wallet.sends.lock().unwrap();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].0, "wallet-1");
    assert_eq!(sends[0].1.value, U256::from(101_000u64));
}

#[tokio::test]
async fn test_execute_rejects_curve_sell() {
    let h = harness(FakeMarket::new(vec![], vec![]), FakeChain::default());
    let intent = TradeIntent {
        token_address: TOKEN.into(),
        venue: MarketPhase::Curve,
        direction: Direction::Sell,
        mode: TradeMode::ExactIn,
        amount: "1".into(),
        slippage_bps: None,
        signer: supplied_key(),
    };
    let err = h.executor.execute(&intent).await.unwrap_err();
    assert!(matches!(err, TradingError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_transfer_native() {
    let h = harness(FakeMarket::new(vec![], vec![]), FakeChain::default());
    let to = "0x00000000000000000000000000000000000000dd";

    let result = h
        .executor
        .transfer_native(to, "1.5", &supplied_key())
        .await
        .unwrap();
    assert_eq!(result.from, key_address());
    assert_eq!(
        result.amount,
        U256::from(15u64) * U256::from(10u64).pow(U256::from(17))
    );
    let sent = h.chain.sent();
    assert_eq!(sent[0].to, to.parse::<Address>().unwrap());
    assert!(sent[0].data.is_empty());
}
