//! Configuration management for pdf-chat
//!
//! Handles model selection, server settings, and persistence of those
//! preferences. The API key is never part of the config.

use crate::contract::DEFAULT_CONTRACT_FILE;
use crate::llm::DEFAULT_MODEL;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// pdf-chat configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Gemini model used for every turn
    #[serde(default = "default_model")]
    pub model: String,
    /// Reasoning contract sent ahead of every prompt
    #[serde(default = "default_contract_path")]
    pub contract_path: PathBuf,
    /// Port for `serve`
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted upload request, in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
    /// Minutes a session may sit unused before it is dropped
    #[serde(default = "default_session_idle_minutes")]
    pub session_idle_minutes: u32,
    /// Override for the Gemini API root (proxies, local testing)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Version of config schema (for future migrations)
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_contract_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONTRACT_FILE)
}

fn default_port() -> u16 {
    8005
}

fn default_max_upload_mb() -> usize {
    100
}

fn default_session_idle_minutes() -> u32 {
    60
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            contract_path: default_contract_path(),
            port: default_port(),
            max_upload_mb: default_max_upload_mb(),
            session_idle_minutes: default_session_idle_minutes(),
            api_base: None,
            version: default_version(),
        }
    }
}

impl Config {
    /// Get the config file path (~/.pdf-chat/config.toml)
    pub fn path() -> Result<PathBuf> {
        Ok(app_dir()?.join("config.toml"))
    }

    /// Check if config exists (i.e., not first run)
    pub fn exists() -> bool {
        Self::path().map(|p| p.exists()).unwrap_or(false)
    }

    /// Load config from disk, or return None if it doesn't exist
    pub fn load() -> Result<Option<Self>> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(Some(config))
    }

    /// Load config, falling back to defaults on first run
    pub fn load_or_default() -> Result<Self> {
        Ok(Self::load()?.unwrap_or_default())
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Request body limit in bytes
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }

    /// How long an unused session is kept
    pub fn session_idle_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.session_idle_minutes))
    }
}

/// Get the base directory path (~/.pdf-chat)
pub fn app_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".pdf-chat"))
}
