//! Configuration and credential storage

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{Credential, CredentialStore};
use crate::session::SessionConfig;

fn default_api_base() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_auth_base() -> String {
    "http://localhost:8080/auth".to_string()
}

/// Session timing knobs, overridable from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Seconds between validity polls while the token is comfortably valid.
    pub poll_interval_secs: u64,
    /// Seconds before expiry at which the user is first warned.
    pub warning_threshold_secs: u64,
    /// Extra seconds past expected expiry before the safety net forces logout.
    pub safety_margin_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let config = SessionConfig::default();
        Self {
            poll_interval_secs: config.poll_interval.as_secs(),
            warning_threshold_secs: config.warning_threshold_secs,
            safety_margin_secs: config.safety_margin_secs,
        }
    }
}

impl SessionSettings {
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            warning_threshold_secs: self.warning_threshold_secs,
            safety_margin_secs: self.safety_margin_secs,
        }
    }
}

/// Application configuration
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the portal REST microservices
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Base URL of the portal auth service
    #[serde(default = "default_auth_base")]
    pub auth_base: String,
    /// Session monitor tuning
    #[serde(default)]
    pub session: SessionSettings,
    /// Stored bearer credential from the last login
    pub credential: Option<Credential>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            auth_base: default_auth_base(),
            session: SessionSettings::default(),
            credential: None,
        }
    }
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "partes-cli", "partes-cli")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir).context("Failed to create config directory")?;

        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains tokens)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }
}

impl CredentialStore for Config {
    fn get_credential(&self) -> Option<Credential> {
        self.credential.clone()
    }

    fn set_credential(&mut self, credential: Credential) {
        self.credential = Some(credential);
    }

    fn clear_credential(&mut self) {
        self.credential = None;
    }
}
