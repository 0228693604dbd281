//! Remaining-validity computation for the bearer credential.
//!
//! Primary strategy: the `exp` claim embedded in a JWT-shaped access token.
//! Fallback: `issued_at + expires_in` from the stored issuance metadata.
//! Parse failures fall back silently; this module never errors.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;

use crate::auth::Credential;

/// Supplies the current unix time. Swapped for a manual source in tests so
/// countdown behavior is deterministic.
pub trait TimeSource: Send + Sync {
    fn now_unix(&self) -> i64;
}

/// Wall-clock time source used outside tests.
pub struct WallClock;

impl TimeSource for WallClock {
    fn now_unix(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Computes how many seconds of validity a credential has left.
#[derive(Clone)]
pub struct TokenClock {
    source: Arc<dyn TimeSource>,
}

#[derive(Deserialize)]
struct Claims {
    exp: i64,
}

impl TokenClock {
    pub fn wall() -> Self {
        Self::with_source(Arc::new(WallClock))
    }

    pub fn with_source(source: Arc<dyn TimeSource>) -> Self {
        Self { source }
    }

    /// Seconds of validity left, floored at zero. A missing credential
    /// counts as zero remaining time.
    pub fn seconds_remaining(&self, credential: Option<&Credential>) -> u64 {
        let Some(cred) = credential else {
            return 0;
        };

        let expiry = embedded_expiry(&cred.access_token)
            .unwrap_or_else(|| cred.issued_at.timestamp() + cred.expires_in as i64);

        (expiry - self.source.now_unix()).max(0) as u64
    }
}

/// Unix expiry from the token's payload segment, when the token is a JWT
/// carrying an `exp` claim. Opaque tokens and malformed payloads yield None.
fn embedded_expiry(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    Some(claims.exp)
}

/// Manually advanced time source for deterministic timer tests.
#[cfg(test)]
pub struct ManualClock {
    now: std::sync::atomic::AtomicI64,
}

#[cfg(test)]
impl ManualClock {
    pub fn at(now: i64) -> Arc<Self> {
        Arc::new(Self {
            now: std::sync::atomic::AtomicI64::new(now),
        })
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl TimeSource for ManualClock {
    fn now_unix(&self) -> i64 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}
