//! Binance API Authentication Module
//!
//! Signed (USER_DATA / TRADE) endpoints need:
//! - the API key in the `X-MBX-APIKEY` header
//! - a `timestamp` parameter in milliseconds
//! - a `signature` parameter: hex HMAC-SHA256 of the urlencoded query string,
//!   keyed with the API secret
//!
//! Credentials are per user, so an authenticator is built per request from
//! the stored user row rather than shared process-wide.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("API credentials not configured")]
    NotConfigured,
    #[error("Invalid API secret: {0}")]
    InvalidSecret(String),
}

/// Binance request signer for one set of credentials
#[derive(Clone)]
pub struct BinanceAuth {
    api_key: String,
    api_secret: String,
}

impl std::fmt::Debug for BinanceAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceAuth")
            .field("api_key", &self.api_key_redacted())
            .finish_non_exhaustive()
    }
}

impl BinanceAuth {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Result<Self, AuthError> {
        let auth = Self {
            api_key: api_key.into().trim().to_string(),
            api_secret: api_secret.into().trim().to_string(),
        };
        if !auth.is_configured() {
            return Err(AuthError::NotConfigured);
        }
        Ok(auth)
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Hex HMAC-SHA256 of `query` keyed with the API secret
    pub fn sign(&self, query: &str) -> Result<String, AuthError> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| AuthError::InvalidSecret(e.to_string()))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Append `signature=` to an already urlencoded query string
    pub fn signed_query(&self, query: &str) -> Result<String, AuthError> {
        let signature = self.sign(query)?;
        Ok(format!("{}&signature={}", query, signature))
    }

    /// Get API key (for display/logging - redacted)
    pub fn api_key_redacted(&self) -> String {
        redact(&self.api_key)
    }
}

/// Current Unix time in milliseconds, as Binance expects for `timestamp`
pub fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Show the first and last four characters of a key
pub fn redact(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "****".to_string()
    }
}
