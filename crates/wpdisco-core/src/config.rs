//! Configuration for discovery requests.
//!
//! Settings are stored in TOML. The file is looked up in this order:
//!
//! 1. The path in the `WPDISCO_CONFIG` environment variable
//! 2. The platform config directory (see [`Config::default_path`])
//!
//! A missing file is not an error; defaults are used instead.
//!
//! ## Example Configuration File
//!
//! ```toml
//! [http]
//! timeout_secs = 30
//! user_agent = "wpdisco/0.3.0"
//! max_body_bytes = 10485760
//!
//! [jetpack]
//! enabled = true
//! api_base = "https://public-api.wordpress.com"
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "WPDISCO_CONFIG";

/// Default user agent sent with probe requests.
pub const DEFAULT_USER_AGENT: &str = concat!("wpdisco/", env!("CARGO_PKG_VERSION"));

/// Default cap on response bodies (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Default WordPress.com public API base used by the Jetpack probe.
pub const DEFAULT_JETPACK_API_BASE: &str = "https://public-api.wordpress.com";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP client settings shared by every network collaborator.
    pub http: HttpConfig,
    /// Jetpack enrichment settings.
    pub jetpack: JetpackConfig,
}

/// HTTP client settings.
///
/// Every network call builds a fresh client from these values; no connection
/// pool or cookie jar outlives a single call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header for probe, page, and RSD requests.
    pub user_agent: String,
    /// Largest response body read from a site, in bytes.
    pub max_body_bytes: usize,
}

impl HttpConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Jetpack enrichment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JetpackConfig {
    /// Whether to ask WordPress.com about Jetpack when discovery fails.
    pub enabled: bool,
    /// Base URL of the WordPress.com public API.
    pub api_base: String,
}

impl Default for JetpackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: DEFAULT_JETPACK_API_BASE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `WPDISCO_CONFIG` or the platform config directory.
    ///
    /// Returns defaults when no file exists.
    ///
    /// ```rust
    /// use wpdisco_core::Config;
    ///
    /// let config = Config::load()?;
    /// println!("timeout: {}s", config.http.timeout_secs);
    /// # Ok::<(), wpdisco_core::Error>(())
    /// ```
    pub fn load() -> Result<Self> {
        match Self::resolve_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path, falling back to defaults if the
    /// file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Save the configuration as pretty TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {e}")))?;

        Ok(())
    }

    /// The platform config file location.
    ///
    /// - Linux: `~/.config/wpdisco/config.toml`
    /// - macOS: `~/Library/Application Support/dev.wpdisco.wpdisco/config.toml`
    /// - Windows: `%APPDATA%\wpdisco\wpdisco\config\config.toml`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "wpdisco", "wpdisco")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn resolve_path() -> Option<PathBuf> {
        std::env::var_os(CONFIG_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(Self::default_path)
    }
}
