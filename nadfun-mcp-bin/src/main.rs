//! Nad.fun MCP server.
//!
//! `stdio` speaks newline-delimited JSON-RPC on stdin/stdout for local
//! clients; `serve` exposes the SSE transport, OAuth and the wallet API over
//! HTTP.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use nadfun_http_api::{AppState, AuthConfig, ServerConfig, build_router};
use nadfun_mcp::ToolContext;
use nadfun_mcp_bin::{AppError, build_services};
use nadfun_runtime::{MarketDataConfig, TradingConfig, WalletProviderConfig};

#[derive(Parser)]
#[command(name = "nadfun-mcp")]
#[command(about = "Nad.fun token trading tools for LLM agents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdin/stdout
    Stdio {
        /// Session whose custodial wallet signs trades
        #[arg(long, env = "NADFUN_SESSION_ID")]
        session_id: Option<String>,
    },
    /// Serve MCP over HTTP + SSE
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let _ = dotenvy::dotenv();
    setup_log();

    let cli = Cli::parse();
    let result = run(cli.command).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Server stopped");
    }
    result
}

async fn run(command: Commands) -> Result<(), AppError> {
    let trading = TradingConfig::from_env()?;
    let market = MarketDataConfig::from_env()?;
    let wallet = WalletProviderConfig::from_env(trading.chain_id);

    match command {
        Commands::Stdio { session_id } => {
            let redis_url = ServerConfig::from_env()?.redis_url;
            let services = build_services(trading, &market, wallet, redis_url.as_deref())?;
            let ctx = ToolContext { session_id };
            nadfun_mcp::stdio::serve_stdio(&services.tools, ctx).await?;
        }
        Commands::Serve => {
            let server = ServerConfig::from_env()?;
            let auth = AuthConfig::from_env()?;
            let services = build_services(trading, &market, wallet, server.redis_url.as_deref())?;
            let require_auth = auth.require_auth;
            let state = Arc::new(AppState::new(
                services.tools,
                services.sessions,
                services.wallet,
                auth,
            ));

            let listener = tokio::net::TcpListener::bind(server.bind_addr).await?;
            tracing::info!(addr = %server.bind_addr, require_auth, "MCP server listening");
            axum::serve(listener, build_router(state))
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutdown signal received");
    }
}

/// Logs go to stderr so stdout stays a clean JSON-RPC channel in stdio mode.
fn setup_log() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber installed earlier wins.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
