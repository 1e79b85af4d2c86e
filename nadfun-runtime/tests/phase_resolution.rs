//! Phase resolution against time-ordered indexer responses.

mod common;

use std::sync::Arc;

use common::*;
use nadfun_runtime::MarketPhase;
use nadfun_runtime::phase::PhaseResolver;

#[tokio::test]
async fn test_phase_never_reverts_to_curve() {
    let source = Arc::new(FakeMarket::new(
        vec![
            market("CURVE", 1, 1, 1, 0),
            market("DEX", 1, 1, 1, 0),
            market("CURVE", 1, 1, 1, 0),
            market("CURVE", 1, 1, 1, 0),
        ],
        vec![info(false)],
    ));
    let resolver = PhaseResolver::new(source);

    let observed = [
        resolver.resolve_phase(TOKEN).await.unwrap().phase,
        resolver.resolve_phase(TOKEN).await.unwrap().phase,
        resolver.resolve_phase(TOKEN).await.unwrap().phase,
        resolver.resolve_phase(TOKEN).await.unwrap().phase,
    ];
    assert_eq!(
        observed,
        [
            MarketPhase::Curve,
            MarketPhase::Dex,
            MarketPhase::Dex,
            MarketPhase::Dex
        ]
    );
}

#[tokio::test]
async fn test_listing_flag_graduates_token() {
    let source = Arc::new(FakeMarket::new(
        vec![market("CURVE", 1, 1, 1, 0)],
        vec![info(true), info(false)],
    ));
    let resolver = PhaseResolver::new(source);

    assert_eq!(resolver.resolve_phase(TOKEN).await.unwrap().phase, MarketPhase::Dex);
    assert_eq!(resolver.resolve_phase(TOKEN).await.unwrap().phase, MarketPhase::Dex);
    assert!(
        resolver
            .assert_phase(TOKEN, MarketPhase::Curve)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_unknown_market_type_is_unavailable() {
    let source = Arc::new(FakeMarket::new(
        vec![market("AUCTION", 1, 1, 1, 0)],
        vec![info(false)],
    ));
    let resolver = PhaseResolver::new(source);

    let err = resolver.resolve_phase(TOKEN).await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_malformed_address_rejected() {
    let source = Arc::new(FakeMarket::new(vec![], vec![]));
    let resolver = PhaseResolver::new(source.clone());

    assert!(resolver.resolve_phase("0xnothex").await.is_err());
    assert!(source.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_dex_trading_requires_listing_flag() {
    let source = Arc::new(FakeMarket::new(
        vec![market("DEX", 1, 1, 1, 0)],
        vec![info(false), info(true)],
    ));
    let resolver = PhaseResolver::new(source.clone());

    assert!(resolver.assert_listed(TOKEN).await.is_err());
    assert!(resolver.assert_listed(TOKEN).await.is_ok());
    assert!(
        source
            .calls
            .lock()
            .unwrap()
            .iter()
            .all(|c| c.as_str() == "token_info")
    );
}
