//! Authentication against the portal auth service
//!
//! Username/password login issues a bearer credential; the refresh token is
//! exchanged for a fresh one by the session subsystem before expiry.

pub mod credentials;
pub mod portal;

pub use credentials::{Credential, CredentialStore, CredentialVault};
pub use portal::AuthClient;

use std::io::Write;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::session::clock::TokenClock;

/// Authenticate against the portal and store the credential.
pub async fn login(username: &str, password: Option<String>, force: bool) -> Result<()> {
    let mut config = Config::load()?;

    if !force {
        if let Some(credential) = config.get_credential() {
            if TokenClock::wall().seconds_remaining(Some(&credential)) > 0 {
                println!("Already logged in (token valid). Use --force to re-authenticate.");
                return Ok(());
            }
        }
    }

    let password = match password {
        Some(p) => p,
        None => prompt_password(username)?,
    };

    let client = AuthClient::new(config.auth_base.clone());
    tracing::info!("Authenticating as {}...", username);
    let credential = client.login(username, &password).await?;

    config.set_credential(credential);
    config.save()?;
    println!("Login successful.");
    Ok(())
}

/// Clear stored credentials
pub async fn logout() -> Result<()> {
    let mut config = Config::load()?;
    config.clear_credential();
    config.save()?;
    println!("Logged out.");
    Ok(())
}

/// Display current auth status
pub async fn status() -> Result<()> {
    let config = Config::load()?;

    match config.get_credential() {
        Some(credential) => {
            let remaining = TokenClock::wall().seconds_remaining(Some(&credential));
            if remaining > 0 {
                println!("Session:     valid");
                println!("  expires_at: {}", credential.expires_at());
                println!("  remaining:  {}s", remaining);
            } else {
                println!("Session:     expired");
            }
            println!("Refresh tok: present");
        }
        None => {
            println!("Session:     none");
            println!("\nRun 'partes-cli login' to authenticate.");
        }
    }

    Ok(())
}

fn prompt_password(username: &str) -> Result<String> {
    print!("Password for {}: ", username);
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read password")?;
    Ok(line.trim_end().to_string())
}
