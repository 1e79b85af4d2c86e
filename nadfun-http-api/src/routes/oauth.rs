//! Google OAuth: `/auth/google` starts the flow, the callback binds the
//! authenticated user (and a fresh custodial wallet) to the caller's session
//! id.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use nadfun_runtime::session::{
    SESSION_TTL, Session, SessionTokens, SessionUser, SessionWallet, now_millis,
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", get(start))
        .route("/auth/google/callback", get(callback))
}

fn json_error(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}

#[derive(Deserialize)]
struct StartQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

async fn start(State(state): State<Arc<AppState>>, Query(query): Query<StartQuery>) -> Response {
    let Some(client_id) = &state.auth.google_client_id else {
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Google Client ID not configured");
    };
    let session_id = query
        .session_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let mut target = match url::Url::parse(&state.auth.authorize_url) {
        Ok(u) => u,
        Err(e) => {
            tracing::error!(error = %e, "Invalid OAuth authorize URL");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "OAuth misconfigured");
        }
    };
    target
        .query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", &state.auth.redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", "openid email profile")
        .append_pair("state", &session_id);

    tracing::info!(%session_id, "Starting OAuth flow");
    Redirect::temporary(target.as_str()).into_response()
}

#[derive(Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Deserialize)]
struct UserInfo {
    sub: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture: Option<String>,
}

async fn callback(State(state): State<Arc<AppState>>, Query(query): Query<CallbackQuery>) -> Response {
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return json_error(StatusCode::BAD_REQUEST, "No code provided");
    };
    let (Some(client_id), Some(client_secret)) =
        (&state.auth.google_client_id, &state.auth.google_client_secret)
    else {
        return json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Google OAuth credentials not configured",
        );
    };

    let token_resp = state
        .http
        .post(&state.auth.token_url)
        .form(&[
            ("code", code.as_str()),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.expose_secret()),
            ("redirect_uri", state.auth.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await;
    let tokens: TokenResponse = match token_resp {
        Ok(r) if r.status().is_success() => match r.json().await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "Token response unreadable");
                return json_error(StatusCode::BAD_REQUEST, "Failed to exchange code for token");
            }
        },
        Ok(r) => {
            tracing::warn!(status = %r.status(), "Token exchange rejected");
            return json_error(StatusCode::BAD_REQUEST, "Failed to exchange code for token");
        }
        Err(e) => {
            tracing::error!(error = %e, "Token exchange failed");
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error during authentication",
            );
        }
    };

    let user: UserInfo = match state
        .http
        .get(&state.auth.userinfo_url)
        .bearer_auth(&tokens.access_token)
        .send()
        .await
    {
        Ok(r) if r.status().is_success() => match r.json().await {
            Ok(u) => u,
            Err(_) => return json_error(StatusCode::BAD_REQUEST, "Failed to get user information"),
        },
        _ => return json_error(StatusCode::BAD_REQUEST, "Failed to get user information"),
    };

    let wallet = match state.wallet.create_wallet().await {
        Ok(w) => Some(SessionWallet {
            id: w.id,
            address: w.address,
        }),
        Err(e) => {
            tracing::warn!(user = %user.sub, error = %e, "Wallet creation failed, continuing without wallet");
            None
        }
    };

    let session = Session {
        user: SessionUser {
            id: user.sub,
            email: user.email,
            name: user.name,
            picture: user.picture,
        },
        wallet,
        tokens: SessionTokens {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            id_token: tokens.id_token,
            expires_at: now_millis() + tokens.expires_in * 1000,
        },
    };

    match query.state.filter(|s| !s.is_empty()) {
        Some(session_id) => {
            if let Err(e) = state.sessions.put(&session_id, &session, SESSION_TTL).await {
                tracing::error!(%session_id, error = %e, "Failed to store session");
                return json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error during authentication",
                );
            }
            tracing::info!(%session_id, user = %session.user.id, "Session authenticated");
        }
        None => tracing::warn!("OAuth callback without state, session not stored"),
    }

    Html(success_page(session.wallet.as_ref())).into_response()
}

fn success_page(wallet: Option<&SessionWallet>) -> String {
    let wallet_block = wallet
        .map(|w| {
            format!(
                "<div class=\"wallet-info\"><strong>Wallet created:</strong><br>Address: {}</div>",
                escape(&w.address)
            )
        })
        .unwrap_or_default();
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<title>Authentication Successful</title>\n\
         <script>window.onload = function() {{ window.close(); }}</script>\n\
         <style>\n\
         body {{ font-family: system-ui, sans-serif; display: flex; align-items: center; justify-content: center; height: 100vh; margin: 0; background-color: #f5f5f5; }}\n\
         .container {{ text-align: center; padding: 2rem; background: white; border-radius: 0.5rem; box-shadow: 0 4px 6px rgba(0, 0, 0, 0.1); }}\n\
         h1 {{ color: #4CAF50; }}\n\
         .wallet-info {{ background-color: #f8f9fa; padding: 1rem; border-radius: 0.5rem; font-family: monospace; overflow-wrap: break-word; }}\n\
         </style>\n</head>\n<body>\n<div class=\"container\">\n\
         <h1>Authentication Successful</h1>\n\
         <p>You are now authenticated with Google. You can close this window and return to your assistant.</p>\n\
         {wallet_block}\n</div>\n</body>\n</html>\n"
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
