//! MCP over SSE: `GET /sse` holds the server-to-client stream, `POST
//! /message` carries client-to-server JSON-RPC.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
};
use futures_util::{Stream, StreamExt, stream};
use nadfun_mcp::ToolContext;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::AppState;
use crate::auth::SESSION_HEADER;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sse", get(open_stream))
        .route("/message", post(post_message))
}

#[derive(Deserialize)]
struct SessionQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Unregisters the stream when the response body is dropped.
struct StreamGuard {
    state: Arc<AppState>,
    session_id: String,
    connection: u64,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.state
            .streams
            .unregister(&self.session_id, self.connection);
        tracing::info!(session_id = %self.session_id, "SSE stream closed");
    }
}

async fn open_stream(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = query
        .session_id
        .or_else(|| {
            headers
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let (tx, rx) = mpsc::unbounded_channel();
    let connection = state.streams.register(&session_id, tx);
    tracing::info!(%session_id, "SSE stream opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/message?sessionId={session_id}"));
    let guard = StreamGuard {
        state,
        session_id,
        connection,
    };
    let messages = UnboundedReceiverStream::new(rx).map(move |msg| {
        let _held = &guard;
        Ok(Event::default().event("message").data(msg))
    });

    Sse::new(stream::once(async move { Ok(endpoint) }).chain(messages))
        .keep_alive(KeepAlive::default())
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
    body: String,
) -> Result<(StatusCode, &'static str), (StatusCode, String)> {
    let session_id = query
        .session_id
        .filter(|s| !s.is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "sessionId query parameter required".into()))?;
    let tx = state.streams.sender(&session_id).ok_or((
        StatusCode::NOT_FOUND,
        format!("No open stream for session {session_id}"),
    ))?;

    // Answered on the stream; a closed stream drops the reply but not the call.
    let tools = state.tools.clone();
    tokio::spawn(async move {
        let ctx = ToolContext::with_session(session_id);
        if let Some(reply) = tools.handle_message(&body, &ctx).await {
            if tx.send(reply).is_err() {
                tracing::warn!(session_id = ?ctx.session_id, "Stream closed before reply");
            }
        }
    });

    Ok((StatusCode::ACCEPTED, "Accepted"))
}
