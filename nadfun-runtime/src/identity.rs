//! Signing identity resolution.
//!
//! Precedence, first match wins:
//! 1. a live session that carries a custodial wallet,
//! 2. a private key supplied on the call,
//! 3. otherwise `NoIdentity`, or the session store's error when the
//!    lookup itself failed.
//!
//! Expired sessions fall through to step 2. Redirecting to re-authenticate
//! is the HTTP layer's job, not this module's.

use std::sync::Arc;

use alloy::primitives::Address;
use secrecy::{ExposeSecret, SecretString};

use crate::error::TradingError;
use crate::session::{SessionStore, now_millis};

/// Who signs a transaction.
pub enum Identity {
    /// Custodial wallet; signing is delegated to the wallet provider.
    SessionWallet { wallet_id: String, address: Address },
    /// Caller-supplied key, held only for the duration of one call.
    SuppliedKey { raw_key: SecretString },
}

impl Identity {
    pub fn kind(&self) -> &'static str {
        match self {
            Identity::SessionWallet { .. } => "session_wallet",
            Identity::SuppliedKey { .. } => "supplied_key",
        }
    }

    /// Public address of the signer.
    pub fn address(&self) -> Result<Address, TradingError> {
        match self {
            Identity::SessionWallet { address, .. } => Ok(*address),
            Identity::SuppliedKey { raw_key } => {
                let signer: alloy::signers::local::PrivateKeySigner = raw_key
                    .expose_secret()
                    .parse()
                    .map_err(|_| TradingError::InvalidArgument("malformed private key".into()))?;
                Ok(signer.address())
            }
        }
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identity::SessionWallet { wallet_id, address } => f
                .debug_struct("SessionWallet")
                .field("wallet_id", wallet_id)
                .field("address", address)
                .finish(),
            Identity::SuppliedKey { .. } => f.write_str("SuppliedKey([REDACTED])"),
        }
    }
}

/// `0x` followed by exactly 64 hex digits.
pub fn validate_private_key(raw: &str) -> Result<SecretString, TradingError> {
    let trimmed = raw.trim();
    let well_formed = trimmed
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()));
    if !well_formed {
        return Err(TradingError::InvalidArgument(
            "private key must be 0x followed by 64 hex characters".into(),
        ));
    }
    Ok(SecretString::from(trimmed.to_string()))
}

pub struct IdentityResolver {
    sessions: Arc<dyn SessionStore>,
}

impl IdentityResolver {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    pub async fn resolve(
        &self,
        session_id: Option<&str>,
        supplied_key: Option<&str>,
    ) -> Result<Identity, TradingError> {
        self.resolve_at(session_id, supplied_key, now_millis()).await
    }

    /// Testable version with an explicit `now` in epoch milliseconds.
    pub async fn resolve_at(
        &self,
        session_id: Option<&str>,
        supplied_key: Option<&str>,
        now_ms: i64,
    ) -> Result<Identity, TradingError> {
        let mut lookup_error = None;
        if let Some(id) = session_id.filter(|s| !s.is_empty()) {
            match self.sessions.get(id).await {
                Ok(Some(session)) if !session.is_expired_at(now_ms) => {
                    if let Some(wallet) = session.wallet {
                        match wallet.address.parse::<Address>() {
                            Ok(address) => {
                                tracing::debug!(session_id = %id, %address, "Resolved session wallet");
                                return Ok(Identity::SessionWallet {
                                    wallet_id: wallet.id,
                                    address,
                                });
                            }
                            Err(e) => {
                                tracing::warn!(session_id = %id, error = %e, "Session wallet address unparseable");
                            }
                        }
                    }
                }
                Ok(Some(_)) => {
                    tracing::debug!(session_id = %id, "Session expired, ignoring");
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(session_id = %id, error = %e, "Session lookup failed");
                    lookup_error = Some(e);
                }
            }
        }

        match supplied_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(raw) => Ok(Identity::SuppliedKey {
                raw_key: validate_private_key(raw)?,
            }),
            None => Err(lookup_error.unwrap_or(TradingError::NoIdentity)),
        }
    }
}
