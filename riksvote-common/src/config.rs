//! Configuration file model and default locations
//!
//! Priority order used by every riksvote binary:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: the caller gets `None`, a warning is
//! logged and compiled defaults apply. A TOML file that exists but does not
//! parse is reported as [`Error::Config`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable holding the store's connection string
pub const DATABASE_URL_ENV: &str = "RIKSVOTE_DATABASE_URL";

/// Environment variable holding the TOML config path
pub const CONFIG_PATH_ENV: &str = "RIKSVOTE_CONFIG";

/// Logging section of the TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g. "info")
    pub level: Option<String>,
}

/// Contents of `riksvote.toml`
///
/// Every field is optional; absent fields fall back to [`CompiledDefaults`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub database_url: Option<String>,
    pub api_base_url: Option<String>,
    /// Explicit session labels (`YYYY/YY`); takes precedence over the year range
    pub sessions: Option<Vec<String>>,
    pub first_session_year: Option<u16>,
    pub last_session_year: Option<u16>,
    pub document_kinds: Option<Vec<String>>,
    pub page_size: Option<u32>,
    pub ballot_page_cap: Option<u32>,
    pub max_pages: Option<u32>,
    pub request_delay_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub flush_concurrency: Option<usize>,
    pub flush_batch_size: Option<usize>,
    pub db_max_lock_wait_ms: Option<u64>,
    pub logging: LoggingConfig,
    /// Extra or overriding committee code → name entries
    pub committees: BTreeMap<String, String>,
}

/// Compiled defaults used when neither CLI, environment nor TOML set a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub database_url: String,
    pub config_path: PathBuf,
    pub api_base_url: String,
    pub document_kinds: Vec<String>,
    pub page_size: u32,
    pub ballot_page_cap: u32,
    pub max_pages: u32,
    pub request_delay_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub request_timeout_secs: u64,
    pub flush_concurrency: usize,
    pub flush_batch_size: usize,
    pub db_max_lock_wait_ms: u64,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("riksvote"))
            .unwrap_or_else(|| PathBuf::from("./riksvote_data"));
        let config_path = dirs::config_dir()
            .map(|d| d.join("riksvote").join("riksvote.toml"))
            .unwrap_or_else(|| PathBuf::from("riksvote.toml"));

        Self {
            database_url: format!("sqlite://{}?mode=rwc", data_dir.join("riksvote.db").display()),
            config_path,
            api_base_url: "https://data.riksdagen.se".to_string(),
            document_kinds: vec!["bet".to_string(), "mot".to_string(), "prop".to_string()],
            page_size: 200,
            ballot_page_cap: 10_000,
            max_pages: 500,
            request_delay_ms: 500,
            max_retries: 3,
            retry_backoff_ms: 1000,
            request_timeout_secs: 60,
            flush_concurrency: 5,
            flush_batch_size: 500,
            db_max_lock_wait_ms: 5000,
            log_level: "info".to_string(),
        }
    }
}

/// Resolve the TOML config path: CLI argument → environment → compiled default
pub fn resolve_config_path(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    CompiledDefaults::for_current_platform().config_path
}

/// Load the TOML config file if present
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    if !path.exists() {
        warn!("Config file not found at {}, using defaults", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded config from {}", path.display());
    Ok(Some(config))
}

/// Resolve the database connection string: CLI → environment → TOML → default
pub fn resolve_database_url(cli_arg: Option<&str>, toml_config: Option<&TomlConfig>) -> String {
    if let Some(url) = cli_arg.filter(|u| !u.trim().is_empty()) {
        return url.to_string();
    }

    if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
        if !url.trim().is_empty() {
            return url;
        }
    }

    if let Some(url) = toml_config.and_then(|c| c.database_url.clone()) {
        return url;
    }

    CompiledDefaults::for_current_platform().database_url
}
