//! HTTP surface configuration: OAuth credentials, the auth gate switch and
//! the listen address.

use std::net::SocketAddr;

use nadfun_runtime::TradingError;
use secrecy::SecretString;

pub const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/auth/google/callback";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Gate `/sse` and `/message` behind an authenticated session.
    pub require_auth: bool,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<SecretString>,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_auth: false,
            google_client_id: None,
            google_client_secret: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            authorize_url: GOOGLE_AUTHORIZE_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, TradingError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TradingError> {
        let mut cfg = Self {
            require_auth: non_empty(lookup("REQUIRE_AUTH")).is_some_and(|v| v == "true"),
            google_client_id: non_empty(lookup("GOOGLE_CLIENT_ID")),
            google_client_secret: non_empty(lookup("GOOGLE_CLIENT_SECRET")).map(SecretString::from),
            ..Self::default()
        };
        if let Some(uri) = non_empty(lookup("OAUTH_REDIRECT_URI")) {
            url::Url::parse(&uri)
                .map_err(|e| TradingError::ConfigError(format!("Invalid OAUTH_REDIRECT_URI: {e}")))?;
            cfg.redirect_uri = uri;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// A gated deployment without OAuth credentials could never admit anyone.
    pub fn validate(&self) -> Result<(), TradingError> {
        if self.require_auth && (self.google_client_id.is_none() || self.google_client_secret.is_none()) {
            return Err(TradingError::ConfigError(
                "REQUIRE_AUTH=true needs GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// `REDIS_URL`, falling back to `KV_URL`. Sessions stay in memory when
    /// neither is set.
    pub redis_url: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, TradingError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TradingError> {
        let bind = non_empty(lookup("BIND_ADDR")).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse()
            .map_err(|e| TradingError::ConfigError(format!("Invalid BIND_ADDR {bind}: {e}")))?;
        Ok(Self {
            bind_addr,
            redis_url: non_empty(lookup("REDIS_URL")).or_else(|| non_empty(lookup("KV_URL"))),
        })
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
