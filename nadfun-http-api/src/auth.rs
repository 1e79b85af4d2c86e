use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use nadfun_runtime::session::now_millis;

use crate::AppState;

pub const PROTECTED_PATHS: [&str; 2] = ["/sse", "/message"];
pub const SESSION_HEADER: &str = "x-mcp-session-id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    /// Send the caller to `/auth/google`, carrying this session id.
    Redirect(String),
}

pub fn is_protected(path: &str) -> bool {
    PROTECTED_PATHS.iter().any(|p| path.starts_with(p))
}

/// Session id from the `sessionId` query parameter, else the
/// `x-mcp-session-id` header.
pub fn session_id(query: Option<&str>, headers: &HeaderMap) -> Option<String> {
    query
        .and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(k, _)| k == "sessionId")
                .map(|(_, v)| v.into_owned())
        })
        .or_else(|| {
            headers
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .filter(|s| !s.is_empty())
}

impl AppState {
    /// Testable version of the gate with an explicit `now` in epoch
    /// milliseconds.
    pub async fn gate_at(&self, path: &str, session_id: Option<&str>, now_ms: i64) -> GateDecision {
        if !self.auth.require_auth || !is_protected(path) {
            return GateDecision::Pass;
        }
        let Some(id) = session_id else {
            let fresh = uuid::Uuid::new_v4().to_string();
            tracing::info!(%path, session_id = %fresh, "No session id, redirecting to auth");
            return GateDecision::Redirect(fresh);
        };
        match self.sessions.get(id).await {
            Ok(Some(session)) if !session.is_expired_at(now_ms) => GateDecision::Pass,
            Ok(Some(_)) => {
                tracing::info!(session_id = %id, "Session expired, redirecting to auth");
                GateDecision::Redirect(id.to_string())
            }
            Ok(None) => {
                tracing::info!(session_id = %id, "Session not authenticated, redirecting to auth");
                GateDecision::Redirect(id.to_string())
            }
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Session lookup failed, redirecting to auth");
                GateDecision::Redirect(id.to_string())
            }
        }
    }
}

/// `/auth/google` with the incoming query, `sessionId` set to `session_id`.
pub fn auth_redirect_target(query: Option<&str>, session_id: &str) -> String {
    let mut out = url::form_urlencoded::Serializer::new(String::new());
    if let Some(q) = query {
        for (k, v) in url::form_urlencoded::parse(q.as_bytes()) {
            if k != "sessionId" {
                out.append_pair(&k, &v);
            }
        }
    }
    out.append_pair("sessionId", session_id);
    format!("/auth/google?{}", out.finish())
}

pub async fn auth_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let query = request.uri().query().map(str::to_string);
    let id = session_id(query.as_deref(), request.headers());
    match state
        .gate_at(request.uri().path(), id.as_deref(), now_millis())
        .await
    {
        GateDecision::Pass => next.run(request).await,
        GateDecision::Redirect(id) => {
            Redirect::temporary(&auth_redirect_target(query.as_deref(), &id)).into_response()
        }
    }
}
