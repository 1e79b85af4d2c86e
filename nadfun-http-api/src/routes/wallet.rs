use std::sync::Arc;

use alloy::primitives::{Bytes, U256};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use nadfun_runtime::chain::TxCall;
use nadfun_runtime::session::{SessionWallet, now_millis};
use nadfun_runtime::units::parse_address;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::AppState;

const TRANSFER_GAS: u64 = 21_000;

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": msg.into() })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/wallet", get(get_wallet).post(wallet_operation))
}

#[derive(Deserialize)]
struct SessionQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Operations a session's custodial wallet accepts.
#[derive(Debug, Deserialize)]
#[serde(tag = "operation", content = "params", rename_all = "snake_case")]
pub enum WalletOperation {
    /// Native transfer; `amount` is in wei.
    SendTransaction { to: String, amount: String },
}

async fn session_wallet(state: &AppState, query: SessionQuery) -> Result<SessionWallet, ApiError> {
    let session_id = query
        .session_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Session ID required"))?;
    let session = state
        .sessions
        .get(&session_id)
        .await
        .map_err(|e| {
            tracing::error!(%session_id, error = %e, "Session lookup failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving wallet information")
        })?
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "User not authenticated"))?;
    if session.is_expired_at(now_millis()) {
        tracing::debug!(%session_id, "Session expired");
        return Err(api_error(StatusCode::UNAUTHORIZED, "Session expired"));
    }
    session
        .wallet
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "No wallet found for this user"))
}

async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Value>, ApiError> {
    let wallet = session_wallet(&state, query).await?;
    Ok(Json(json!({
        "address": wallet.address,
        "message": "Wallet found for this user",
    })))
}

async fn wallet_operation(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    if query.session_id.as_deref().is_none_or(str::is_empty) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Session ID required"));
    }
    let Some(name) = body.get("operation").and_then(Value::as_str).map(str::to_string) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Operation parameter required"));
    };
    let operation: WalletOperation = serde_json::from_value(body).map_err(|e| {
        if name == "send_transaction" {
            api_error(
                StatusCode::BAD_REQUEST,
                format!("To address and amount are required for transaction: {e}"),
            )
        } else {
            api_error(StatusCode::BAD_REQUEST, format!("Unsupported operation: {name}"))
        }
    })?;

    let wallet = session_wallet(&state, query).await?;

    match operation {
        WalletOperation::SendTransaction { to, amount } => {
            let to = parse_address(&to).map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
            let value: U256 = amount
                .trim()
                .parse()
                .map_err(|_| api_error(StatusCode::BAD_REQUEST, format!("Invalid amount (wei): {amount}")))?;
            let call = TxCall {
                to,
                data: Bytes::new(),
                value,
                gas_limit: TRANSFER_GAS,
            };
            let hash = state
                .wallet
                .send_transaction(&wallet.id, call)
                .await
                .map_err(|e| {
                    tracing::error!(wallet_id = %wallet.id, error = %e, "Wallet transaction failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({
                            "error": "Failed to execute transaction",
                            "details": e.to_string(),
                        })),
                    )
                })?;
            Ok(Json(json!({
                "success": true,
                "transaction": { "hash": hash, "from": wallet.address, "to": to.to_string(), "value": value.to_string() },
            })))
        }
    }
}
