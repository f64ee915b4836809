//! Configuration management for TRX.
//!
//! Loads configuration from ${TRX_CONFIG_DIR}/config.toml with sensible
//! defaults, then applies environment overrides (TRX_BASE_URL, TRX_USER_ID).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// How a query is executed by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Incremental SSE ingestion (default)
    #[default]
    Stream,
    /// One synchronous call returning the full response
    Batch,
}

impl QueryMode {
    pub fn is_batch(self) -> bool {
        matches!(self, QueryMode::Batch)
    }
}

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, edit default_config.toml directly.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for TRX configuration and log directories.
    //!
    //! TRX_CONFIG_DIR resolution order:
    //! 1. TRX_CONFIG_DIR environment variable (if set)
    //! 2. ~/.config/trx (default)

    use std::path::PathBuf;

    /// Returns the TRX home directory.
    pub fn trx_home() -> PathBuf {
        if let Ok(home) = std::env::var("TRX_CONFIG_DIR") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("trx"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        trx_home().join("config.toml")
    }

    /// Returns the directory for TUI log files.
    pub fn logs_dir() -> PathBuf {
        trx_home().join("logs")
    }
}

/// Resolved client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Agent backend base URL
    pub base_url: String,
    /// User id sent with every request
    pub user_id: String,
    /// Default query mode
    pub mode: QueryMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            user_id: Self::DEFAULT_USER_ID.to_string(),
            mode: QueryMode::default(),
        }
    }
}

impl Config {
    pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
    pub const DEFAULT_USER_ID: &str = "default_user";

    /// Loads configuration from the default config path and applies
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&paths::config_path())?;
        if let Ok(base_url) = std::env::var("TRX_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(user_id) = std::env::var("TRX_USER_ID") {
            config.user_id = user_id;
        }
        config.normalize();
        Ok(config)
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config: Config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        } else {
            Config::default()
        };
        config.normalize();
        Ok(config)
    }

    /// Writes the commented default template, failing if a config exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            bail!("config already exists at {}", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    // Trailing slashes break path joining against the base URL.
    fn normalize(&mut self) {
        while self.base_url.ends_with('/') {
            self.base_url.pop();
        }
    }
}
