//! Session/token lifecycle monitoring
//!
//! Tracks the bearer credential's remaining validity, warns before expiry,
//! coordinates an exactly-once renewal attempt per warning window, and
//! falls back to forced logout when renewal fails or time runs out.

pub mod clock;
pub mod monitor;
pub mod renewal;
pub mod scheduler;

pub use monitor::{SessionMonitor, SessionView};
pub use renewal::{RefreshApi, RenewalCoordinator, RenewalError};

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::auth::{AuthClient, CredentialStore, CredentialVault};
use crate::config::Config;

/// Tuning for the expiry scheduler. Exposed as configuration rather than
/// buried constants; defaults mirror the portal web client.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How often to poll remaining validity while comfortably valid.
    pub poll_interval: Duration,
    /// Seconds before expiry at which the user is first warned.
    pub warning_threshold_secs: u64,
    /// Extra seconds past the expected expiry before the safety net fires.
    pub safety_margin_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            warning_threshold_secs: 30,
            safety_margin_secs: 5,
        }
    }
}

/// Session lifecycle states. Exactly one is current at any time; the
/// monitor is the only writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Active,
    Warning,
    Renewing,
    Expired,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Active => "active",
            SessionState::Warning => "warning",
            SessionState::Renewing => "renewing",
            SessionState::Expired => "expired",
        }
    }
}

/// Lifecycle messages for collaborator screens, fired after every
/// transition they might care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoginSuccess,
    Logout,
    AuthStateChanged(SessionState),
}

/// Run the session monitor in the foreground with an interactive
/// extend/reject prompt. Exits on logout (expiry or renewal failure) or
/// Ctrl-C (teardown, credential kept).
pub async fn watch() -> Result<()> {
    let mut config = Config::load()?;
    let Some(credential) = config.get_credential() else {
        bail!("Not logged in. Run 'partes-cli login' first.");
    };

    let vault = CredentialVault::new(None);
    let auth: Arc<dyn RefreshApi> = Arc::new(AuthClient::new(config.auth_base.clone()));
    let monitor = SessionMonitor::new(
        config.session.to_session_config(),
        vault.clone(),
        auth,
    );

    let mut events = monitor.subscribe();
    let mut view = monitor.view();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    monitor.notify_login(credential).await;
    tracing::debug!(
        scheduler_active = monitor.scheduler_active().await,
        "session monitor started"
    );
    println!("Session monitor running. (y: extend / n: reject / q: log out / Ctrl-C to detach)");

    let mut renewal_pending = false;
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(SessionEvent::Logout) => {
                        println!("Session ended — logged out.");
                        break;
                    }
                    Ok(SessionEvent::AuthStateChanged(SessionState::Renewing)) => {
                        renewal_pending = true;
                    }
                    Ok(SessionEvent::AuthStateChanged(SessionState::Active)) if renewal_pending => {
                        renewal_pending = false;
                        // A renewal landed; keep the stored credential current.
                        if let Some(fresh) = vault.get() {
                            config.set_credential(fresh);
                            config.save()?;
                            println!("Session extended.");
                        }
                    }
                    Ok(_) => {}
                    Err(_) => {}
                }
            }
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = view.borrow_and_update().clone();
                tracing::debug!(state = snapshot.state.as_str(), "session view updated");
                if snapshot.is_renewing {
                    println!("Renewing session...");
                } else if snapshot.show_expiration_warning {
                    println!(
                        "Session expires in {}s — extend? [y/n]",
                        snapshot.seconds_until_expiry
                    );
                }
            }
            line = stdin.next_line() => {
                let Ok(Some(line)) = line else { continue };
                match line.trim() {
                    // Ignore a double-tap while a renewal is already in flight.
                    "y" | "Y" if !monitor.is_renewing() => {
                        if let Err(e) = monitor.extend_session().await {
                            tracing::warn!("Extend failed: {}", e);
                        }
                    }
                    "n" | "N" => monitor.reject_extension().await,
                    "q" | "Q" => monitor.notify_logout().await,
                    _ => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Shutting down...");
                monitor.stop().await;
                // Teardown keeps the credential for the next run.
                if let Some(current) = vault.get() {
                    config.set_credential(current);
                    config.save()?;
                }
                return Ok(());
            }
        }
    }

    // Logged out: drop the stored credential too.
    config.clear_credential();
    config.save()?;
    Ok(())
}
