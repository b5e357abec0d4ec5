//! Configuration loading and resolution
//!
//! Settings come from four tiers, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing TOML file is not an error: the UI logs a warning and starts
//! with defaults. A TOML file that exists but cannot be parsed is.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable overriding the backend base URL
pub const API_URL_ENV: &str = "FORTE_API_URL";

/// Compiled default backend base URL (local Node server)
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000";

/// Compiled default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;

/// Compiled default number of rows per table page
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the REST backend (e.g. `http://127.0.0.1:3000`)
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Rows per page in directory tables
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            request_timeout_ms: default_request_timeout_ms(),
            page_size: default_page_size(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Fully resolved UI configuration
#[derive(Debug, Clone, PartialEq)]
pub struct UiConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub page_size: usize,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

/// Resolves [`UiConfig`] from CLI, environment, TOML and compiled defaults
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_api_url: Option<String>,
    config_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend URL given on the command line (highest priority)
    pub fn with_cli_api_url(mut self, url: Option<String>) -> Self {
        self.cli_api_url = url;
        self
    }

    /// Explicit TOML file path; falls back to [`default_config_path`]
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// TOML file this resolver reads, if any
    pub fn config_file(&self) -> Option<PathBuf> {
        self.config_path.clone().or_else(default_config_path)
    }

    /// Load the TOML tier, degrading to defaults when the file is absent
    pub fn load_toml(&self) -> Result<TomlConfig> {
        let Some(path) = self.config_file() else {
            debug!("No config directory on this platform, using defaults");
            return Ok(TomlConfig::default());
        };

        if !path.exists() {
            if self.config_path.is_some() {
                warn!("Config file {} not found, using defaults", path.display());
            } else {
                debug!("No config file at {}, using defaults", path.display());
            }
            return Ok(TomlConfig::default());
        }

        load_toml_config(&path)
    }

    /// Resolve the final configuration
    pub fn resolve(&self) -> Result<UiConfig> {
        let toml_config = self.load_toml()?;

        // Priority 1: Command-line argument
        // Priority 2: Environment variable
        // Priority 3: TOML config file
        // Priority 4: Compiled default
        let api_base_url = if let Some(url) = &self.cli_api_url {
            info!("Backend URL from command line: {}", url);
            url.clone()
        } else if let Ok(url) = std::env::var(API_URL_ENV) {
            info!("Backend URL from {}: {}", API_URL_ENV, url);
            url
        } else if let Some(url) = &toml_config.api_base_url {
            info!("Backend URL from config file: {}", url);
            url.clone()
        } else {
            DEFAULT_API_BASE_URL.to_string()
        };

        validate_base_url(&api_base_url)?;

        if toml_config.page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".to_string()));
        }

        Ok(UiConfig {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_millis(toml_config.request_timeout_ms),
            page_size: toml_config.page_size,
            log_level: toml_config.logging.level,
            log_file: toml_config.logging.file,
        })
    }
}

/// Parse a TOML bootstrap file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Default configuration file path for the platform
///
/// `~/.config/forte/config.toml` on Linux, the platform equivalent elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("forte").join("config.toml"))
}

fn validate_base_url(url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Backend URL must start with http:// or https://: {}",
            url
        )))
    }
}
