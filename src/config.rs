//! Layered configuration for the board client.
//!
//! Settings are read from a TOML file, then overridden by environment
//! variables, then by command-line flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [remote]
//! base_url = "http://localhost:5678/webhook/board"
//! timeout_secs = 15
//! token = "optional bearer token"
//!
//! [user]
//! name = "Ana"
//! ```
//!
//! The default file location is `<config dir>/taskboard/config.toml`.
//! Environment overrides: `TASKBOARD_BASE_URL`, `TASKBOARD_TOKEN`,
//! `TASKBOARD_USER`. A `.env` file in the working directory is loaded
//! before the environment is read.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_BASE_URL: &str = "TASKBOARD_BASE_URL";
pub const ENV_TOKEN: &str = "TASKBOARD_TOKEN";
pub const ENV_USER: &str = "TASKBOARD_USER";

/// Connection settings for the remote board service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL every endpoint path is joined to
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Bearer token sent as `Authorization`, if any
    #[serde(default)]
    pub token: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:5678/webhook/board".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            token: None,
        }
    }
}

/// The acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    /// Name used as the default assignee and in activity entries
    #[serde(default = "default_user_name")]
    pub name: String,
}

fn default_user_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            name: default_user_name(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub user: UserConfig,
}

impl BoardConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse taskboard config")
    }

    /// Default file location, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("taskboard").join("config.toml"))
    }

    /// Load the explicit path if given (it must exist), else the default
    /// path if it exists, else defaults. Environment overrides are applied
    /// on top.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from an environment lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = get(ENV_BASE_URL) {
            self.remote.base_url = url;
        }
        if let Some(token) = get(ENV_TOKEN) {
            self.remote.token = Some(token);
        }
        if let Some(user) = get(ENV_USER) {
            self.user.name = user;
        }
    }

    /// Render as TOML, with the token masked.
    pub fn to_display_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.remote.token.is_some() {
            shown.remote.token = Some("********".to_string());
        }
        toml::to_string_pretty(&shown).context("Failed to serialize taskboard config")
    }
}
