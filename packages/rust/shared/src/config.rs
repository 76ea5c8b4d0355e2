//! Application configuration for ReturnScope.
//!
//! User config lives at `~/.returnscope/returnscope.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ReturnScopeError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "returnscope.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".returnscope";

// ---------------------------------------------------------------------------
// Config structs (matching returnscope.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Seller-center list API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Enrichment pipeline settings.
    #[serde(default)]
    pub enrich: EnrichSectionConfig,
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the seller-center API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request language code sent on every list call.
    #[serde(default = "default_language")]
    pub language: String,

    /// Records per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Courtesy delay between page requests, in ms.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Hard ceiling on pages per crawl, against servers that never
    /// report `hasMore = false`.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// How long to wait for captured credentials before falling back.
    #[serde(default = "default_credential_wait_secs")]
    pub credential_wait_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            language: default_language(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay_ms(),
            max_pages: default_max_pages(),
            credential_wait_secs: default_credential_wait_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://seller.example.com".into()
}
fn default_language() -> String {
    "id".into()
}
fn default_page_size() -> u32 {
    50
}
fn default_page_delay_ms() -> u64 {
    500
}
fn default_max_pages() -> u32 {
    100
}
fn default_credential_wait_secs() -> u64 {
    5
}

/// `[enrich]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichSectionConfig {
    /// Maximum concurrent enrichment fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Per-item enrichment deadline in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EnrichSectionConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_concurrency() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    15
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config file + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Base URL of the seller-center API.
    pub base_url: String,
    /// Request language code.
    pub language: String,
    /// Records per page.
    pub page_size: u32,
    /// Delay between page requests.
    pub page_delay: Duration,
    /// Hard ceiling on pages per crawl.
    pub max_pages: u32,
    /// Bounded wait for captured credentials.
    pub credential_wait: Duration,
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.api.base_url.clone(),
            language: config.api.language.clone(),
            page_size: config.api.page_size,
            page_delay: Duration::from_millis(config.api.page_delay_ms),
            max_pages: config.api.max_pages,
            credential_wait: Duration::from_secs(config.api.credential_wait_secs),
        }
    }
}

/// Runtime enrichment configuration.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Maximum in-flight enrichment fetches.
    pub concurrency: u32,
    /// Per-item deadline.
    pub timeout: Duration,
}

impl From<&AppConfig> for EnrichConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.enrich.concurrency,
            timeout: Duration::from_secs(config.enrich.timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.returnscope/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ReturnScopeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.returnscope/returnscope.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ReturnScopeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ReturnScopeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ReturnScopeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ReturnScopeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ReturnScopeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
