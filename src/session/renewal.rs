//! Exactly-once credential renewal against the auth service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::{Credential, CredentialVault};

/// Why a renewal attempt did not produce a fresh credential.
#[derive(Debug, Error)]
pub enum RenewalError {
    /// Another renewal is already talking to the auth service.
    #[error("a renewal is already in flight")]
    AlreadyInFlight,
    /// No stored credential to renew, or no session to extend.
    #[error("no session to renew")]
    NoSession,
    #[error("refresh request failed: {0}")]
    Transport(String),
    #[error("refresh rejected by the auth service: {0}")]
    Rejected(String),
    #[error("malformed refresh response: {0}")]
    Malformed(String),
}

/// The refresh capability consumed by the coordinator. Implemented by the
/// portal auth client; tests substitute doubles.
#[async_trait]
pub trait RefreshApi: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<Credential, RenewalError>;
}

/// Serializes renewal attempts and commits successful results to the store.
///
/// At most one renewal is in flight at a time; a caller arriving while one is
/// pending is turned away with [`RenewalError::AlreadyInFlight`] and no second
/// network attempt is made. The coordinator never logs the user out — failure
/// handling belongs to the session monitor.
pub struct RenewalCoordinator {
    api: Arc<dyn RefreshApi>,
    vault: CredentialVault,
    in_flight: AtomicBool,
}

impl RenewalCoordinator {
    pub fn new(api: Arc<dyn RefreshApi>, vault: CredentialVault) -> Self {
        Self {
            api,
            vault,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_renewing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Exchange the stored refresh token for a fresh credential and replace
    /// the stored one wholesale before returning it.
    pub async fn renew(&self) -> Result<Credential, RenewalError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RenewalError::AlreadyInFlight);
        }

        let result = self.renew_inner().await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn renew_inner(&self) -> Result<Credential, RenewalError> {
        let refresh_token = self
            .vault
            .get()
            .map(|c| c.refresh_token)
            .ok_or(RenewalError::NoSession)?;

        let credential = self.api.refresh(&refresh_token).await?;
        self.vault.set(credential.clone());

        tracing::info!(
            expires_in = credential.expires_in,
            "credential renewed"
        );
        Ok(credential)
    }
}
