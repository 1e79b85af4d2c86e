pub mod auth;
pub mod config;
pub mod routes;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use nadfun_mcp::NadfunTools;
use nadfun_runtime::session::SessionStore;
use nadfun_runtime::wallet::CustodialWallet;

pub use config::{AuthConfig, ServerConfig};

pub struct AppState {
    pub tools: Arc<NadfunTools>,
    pub sessions: Arc<dyn SessionStore>,
    pub wallet: Arc<dyn CustodialWallet>,
    pub auth: AuthConfig,
    pub streams: StreamRegistry,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        tools: Arc<NadfunTools>,
        sessions: Arc<dyn SessionStore>,
        wallet: Arc<dyn CustodialWallet>,
        auth: AuthConfig,
    ) -> Self {
        Self {
            tools,
            sessions,
            wallet,
            auth,
            streams: StreamRegistry::default(),
            http: reqwest::Client::new(),
        }
    }
}

struct StreamEntry {
    connection: u64,
    tx: mpsc::UnboundedSender<String>,
}

/// Open SSE streams by session id. A reconnect with the same id replaces the
/// older stream.
#[derive(Default)]
pub struct StreamRegistry {
    streams: DashMap<String, StreamEntry>,
    next_connection: AtomicU64,
}

impl StreamRegistry {
    /// Returns the connection number to pass back to `unregister`.
    pub fn register(&self, session_id: &str, tx: mpsc::UnboundedSender<String>) -> u64 {
        let connection = self.next_connection.fetch_add(1, Ordering::Relaxed);
        self.streams
            .insert(session_id.to_string(), StreamEntry { connection, tx });
        connection
    }

    /// Removes the stream only if it is still the one registered under
    /// `connection`.
    pub fn unregister(&self, session_id: &str, connection: u64) {
        self.streams
            .remove_if(session_id, |_, entry| entry.connection == connection);
    }

    pub fn sender(&self, session_id: &str) -> Option<mpsc::UnboundedSender<String>> {
        self.streams.get(session_id).map(|e| e.tx.clone())
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::sse::router())
        .merge(routes::oauth::router())
        .merge(routes::wallet::router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::auth_gate,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
