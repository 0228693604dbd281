//! Credential storage and management

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Bearer credential issued by the portal auth service.
///
/// `issued_at + expires_in` is the expiry instant; when the access token is
/// JWT-shaped its embedded `exp` claim takes precedence (see
/// [`crate::session::clock`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_in: u64,
}

impl Credential {
    pub fn new(
        access_token: String,
        refresh_token: String,
        issued_at: DateTime<Utc>,
        expires_in: u64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            issued_at,
            expires_in,
        }
    }

    /// Expiry instant per the stored issuance metadata.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::seconds(self.expires_in as i64)
    }
}

/// Credential store trait for different storage backends
pub trait CredentialStore {
    fn get_credential(&self) -> Option<Credential>;
    fn set_credential(&mut self, credential: Credential);
    fn clear_credential(&mut self);
}

/// Thread-safe in-memory credential store shared between the session monitor,
/// the renewal coordinator, and the API layer. Single writer at a time; the
/// whole credential is replaced or cleared in one guarded write.
#[derive(Clone, Default)]
pub struct CredentialVault {
    slot: Arc<Mutex<Option<Credential>>>,
}

impl CredentialVault {
    pub fn new(credential: Option<Credential>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(credential)),
        }
    }

    pub fn get(&self) -> Option<Credential> {
        self.slot.lock().unwrap().clone()
    }

    pub fn set(&self, credential: Credential) {
        *self.slot.lock().unwrap() = Some(credential);
    }

    pub fn clear(&self) {
        *self.slot.lock().unwrap() = None;
    }
}
