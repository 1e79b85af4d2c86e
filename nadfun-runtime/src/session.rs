//! Authenticated sessions keyed by an opaque caller-held id.
//!
//! One record per session under `auth:{sessionId}`, written with a 24 h TTL
//! by the OAuth callback and only ever read afterwards.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::TradingError;

pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub fn session_key(session_id: &str) -> String {
    format!("auth:{session_id}")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// Custodial wallet handle. The signing key stays with the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionWallet {
    pub id: String,
    pub address: String,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Epoch milliseconds.
    pub expires_at: i64,
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user: SessionUser,
    pub wallet: Option<SessionWallet>,
    pub tokens: SessionTokens,
}

impl Session {
    /// A session is dead once `expires_at` lies strictly in the past.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.tokens.expires_at < now_ms
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Result<Option<Session>, TradingError>;

    async fn put(
        &self,
        session_id: &str,
        session: &Session,
        ttl: Duration,
    ) -> Result<(), TradingError>;
}

/// Redis-backed store. A multiplexed connection is opened per call and
/// dropped on every exit path.
pub struct RedisSessionStore {
    client: redis::Client,
}

impl RedisSessionStore {
    pub fn new(redis_url: &str) -> Result<Self, TradingError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| TradingError::ConfigError(format!("Invalid REDIS_URL: {e}")))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, TradingError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TradingError::SessionStore(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<Session>, TradingError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(session_key(session_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| TradingError::SessionStore(e.to_string()))?;
        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| TradingError::SessionStore(format!("corrupt session record: {e}"))),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        session_id: &str,
        session: &Session,
        ttl: Duration,
    ) -> Result<(), TradingError> {
        let json = serde_json::to_string(session)?;
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(session_key(session_id))
            .arg(json)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| TradingError::SessionStore(e.to_string()))?;
        Ok(())
    }
}

/// Process-local store for single-instance deployments and tests.
#[derive(Default)]
pub struct InMemorySessionStore {
    entries: DashMap<String, (Session, Instant)>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<Session>, TradingError> {
        let key = session_key(session_id);
        let now = Instant::now();
        self.entries.remove_if(&key, |_, (_, expires)| *expires <= now);
        Ok(self.entries.get(&key).map(|entry| entry.0.clone()))
    }

    async fn put(
        &self,
        session_id: &str,
        session: &Session,
        ttl: Duration,
    ) -> Result<(), TradingError> {
        let now = Instant::now();
        self.entries.retain(|_, (_, expires)| *expires > now);
        self.entries
            .insert(session_key(session_id), (session.clone(), now + ttl));
        Ok(())
    }
}
