//! Configuration: backend endpoint, bearer token, stream reliability knobs.
//!
//! Loaded from TOML with per-field defaults so a minimal file (or none at
//! all) still yields a working config. The token can always be overridden
//! through `DRAFTSYNC_TOKEN` so credentials stay out of config files.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const TOKEN_ENV_VAR: &str = "DRAFTSYNC_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer credential obtained out of band.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub stream: StreamConfig,

    /// Page size for protocol listings.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

/// Reliability knobs for the live update stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StreamConfig {
    /// A connection attempt that neither opens nor errors within this
    /// window is treated as failed. The same window bounds the wait for
    /// the first frame after a successful open.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Fixed delay between reconnect attempts.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Reconnect attempts before degrading to the snapshot poll fallback.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Interval of the degraded snapshot refetch loop.
    #[serde(default = "default_fallback_poll_secs")]
    pub fallback_poll_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_page_size() -> u64 {
    20
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_reconnect_delay_secs() -> u64 {
    3
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_fallback_poll_secs() -> u64 {
    15
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            fallback_poll_secs: default_fallback_poll_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            stream: StreamConfig::default(),
            page_size: default_page_size(),
        }
    }
}

impl Config {
    /// Default config file location (`~/.config/draftsync/config.toml` on
    /// Linux, platform-equivalent elsewhere).
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "draftsync")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Self =
            toml::from_str(&raw).map_err(|e| ConfigError::Load(e.to_string()))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load from the default location, falling back to defaults when no
    /// file exists.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                let mut config = Self::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            if !token.is_empty() {
                self.token = Some(token);
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Validation("base_url must not be empty".into()));
        }
        if self.stream.max_reconnect_attempts == 0 {
            return Err(ConfigError::Validation(
                "stream.max_reconnect_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
