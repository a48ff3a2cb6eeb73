//! Engine configuration management.
//!
//! The configuration names the remote API, the page size, the overall loading
//! deadline and where the dataset cache lives. It is stored at
//! `~/.config/passages/config.json`, which is edited by hand; every field
//! can also be overridden from `PASSAGES_*` environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::fetch::NetworkClass;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "passages";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Public API host
pub const DEFAULT_BASE_URL: &str = "https://api.cacem.fr";

/// Paginated resource under `/api/v2/`
pub const DEFAULT_RESOURCE: &str = "dechets/passages";

/// Records requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 5000;

/// Deadline for a whole acquisition, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not find {0} directory")]
    NoDirectory(&'static str),

    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub resource: String,
    pub page_size: usize,
    pub use_cache: bool,
    pub timeout_secs: u64,
    /// Bandwidth tier reported by the host, if it reports one
    pub network_class: Option<NetworkClass>,
    /// Overrides the platform cache directory
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            resource: DEFAULT_RESOURCE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            use_cache: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            network_class: None,
            cache_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoDirectory("config"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir().ok_or(ConfigError::NoDirectory("cache"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Apply `PASSAGES_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Unparsable values are
    /// skipped with a warning so a typo never prevents loading.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("PASSAGES_BASE_URL") {
            self.base_url = url;
        }
        if let Some(resource) = lookup("PASSAGES_RESOURCE") {
            self.resource = resource;
        }
        if let Some(size) = parse_override(&lookup, "PASSAGES_PAGE_SIZE") {
            self.page_size = size;
        }
        if let Some(secs) = parse_override(&lookup, "PASSAGES_TIMEOUT_SECS") {
            self.timeout_secs = secs;
        }
        if let Some(class) = parse_override(&lookup, "PASSAGES_NETWORK_CLASS") {
            self.network_class = Some(class);
        }
        if let Some(dir) = lookup("PASSAGES_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".to_string()));
        }
        if self.base_url.is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_override<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key = key, value = %raw, "Ignoring invalid environment override");
            None
        }
    }
}
