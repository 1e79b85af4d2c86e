use nadfun_mcp::ToolContext;
use nadfun_mcp_bin::build_services;
use nadfun_runtime::{MarketDataConfig, TradingConfig, TradingError};

#[tokio::test]
async fn test_default_services_answer_tools_list() {
    let services =
        build_services(TradingConfig::default(), &MarketDataConfig::default(), None, None).unwrap();
    let reply = services
        .tools
        .handle_message(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
            &ToolContext::default(),
        )
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(json["result"]["tools"].as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn test_wallet_disabled_without_credentials() {
    let services =
        build_services(TradingConfig::default(), &MarketDataConfig::default(), None, None).unwrap();
    let err = services.wallet.create_wallet().await.unwrap_err();
    assert!(matches!(err, TradingError::WalletProvider(_)));
}

#[tokio::test]
async fn test_bad_redis_url_fails_fast() {
    let result = build_services(
        TradingConfig::default(),
        &MarketDataConfig::default(),
        None,
        Some("not a redis url"),
    );
    assert!(matches!(result, Err(TradingError::ConfigError(_))));
}

#[tokio::test]
async fn test_bad_rpc_url_fails_fast() {
    let trading = TradingConfig {
        rpc_url: "::not-a-url::".into(),
        ..TradingConfig::default()
    };
    let result = build_services(trading, &MarketDataConfig::default(), None, None);
    assert!(matches!(result, Err(TradingError::ConfigError(_))));
}
