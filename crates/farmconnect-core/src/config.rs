//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, request timeouts, the credential
//! backend and the last phone number used to log in.
//!
//! Configuration is stored at `~/.config/farmconnect/config.json`.
//! `FARMCONNECT_API_URL` overrides the stored base URL.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::client::RENEWAL_TIMEOUT_SECS;

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "farmconnect";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Encrypted credential file name
const CREDENTIALS_FILE: &str = "credentials.enc";

/// Environment variable overriding `api_url`
pub const API_URL_ENV: &str = "FARMCONNECT_API_URL";

const DEFAULT_API_URL: &str = "https://api.farmconnect.in";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Where the long-lived credential is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialBackend {
    /// OS keychain (Keychain, Credential Manager, kernel keyring)
    #[default]
    Keyring,
    /// Encrypted file in the data directory, for hosts without a keychain
    EncryptedFile,
    /// Process memory only; nothing survives a restart
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_renewal_timeout")]
    pub renewal_timeout_secs: u64,
    #[serde(default)]
    pub credential_backend: CredentialBackend,
    #[serde(default)]
    pub last_phone_number: Option<String>,
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_renewal_timeout() -> u64 {
    RENEWAL_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            renewal_timeout_secs: RENEWAL_TIMEOUT_SECS,
            credential_backend: CredentialBackend::default(),
            last_phone_number: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Base URL with the environment override applied
    pub fn api_base_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn credentials_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(CREDENTIALS_FILE))
    }
}

// ============================================================================
// Tests
// ============================================================================
