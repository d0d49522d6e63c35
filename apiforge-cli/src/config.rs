//! CLI configuration handling.
//!
//! Configuration lives in `config.toml` in the platform config directory
//! (`~/.config/apiforge/config.toml` on Linux). A missing file means
//! defaults.
//!
//! ```toml
//! log_level = "debug"
//!
//! [retry]
//! backoff_secs = [1, 3]
//! timeout_secs = 30
//!
//! [vendors.sharepoint]
//! client_id = "..."
//! client_secret = "..."
//! redirect_uri = "http://localhost:8080/callback"
//! scope = "offline_access User.Read Files.Read.All"
//! tenant_id = "contoso.onmicrosoft.com"
//!
//! [endpoints.sharepoint]
//! api_base_url = "https://graph.microsoft.us/v1.0"
//! ```

use anyhow::{Context, Result};
use apiforge_core::http::DEFAULT_BACKOFF_SECS;
use apiforge_core::store::DEFAULT_FILE_NAME;
use apiforge_core::{AuthConfig, EndpointTable, RetryPolicy};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Path to the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory holding the credentials file.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Logging level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub retry: RetryConfig,

    /// OAuth client settings per vendor ID.
    #[serde(default)]
    pub vendors: BTreeMap<String, AuthConfig>,

    /// Endpoint overrides per vendor ID.
    #[serde(default)]
    pub endpoints: BTreeMap<String, EndpointOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Delays between attempts, in seconds.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: Vec<u64>,

    /// Statuses to retry; 429 and 5xx when unset.
    #[serde(default)]
    pub retry_statuses: Option<Vec<u16>>,

    /// Per-attempt timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Replacement URLs for a built-in vendor, e.g. a national cloud or a
/// staging environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointOverride {
    pub authorize_url: Option<String>,
    pub token_url: Option<String>,
    pub api_base_url: Option<String>,
}

fn default_data_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".apiforge"))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_backoff_secs() -> Vec<u64> {
    DEFAULT_BACKOFF_SECS.to_vec()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_secs: default_backoff_secs(),
            retry_statuses: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::from_secs(&self.backoff_secs);
        match &self.retry_statuses {
            Some(statuses) => policy.with_retry_statuses(statuses.clone()),
            None => policy,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl EndpointOverride {
    /// Apply the overrides to a vendor's endpoint table.
    pub fn apply(&self, mut table: EndpointTable) -> EndpointTable {
        if let Some(url) = &self.authorize_url {
            table.authorize_url = url.clone();
        }
        if let Some(url) = &self.token_url {
            table.token_url = url.clone();
        }
        if let Some(url) = &self.api_base_url {
            table.api_base_url = url.clone();
        }
        table
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            retry: RetryConfig::default(),
            vendors: BTreeMap::new(),
            endpoints: BTreeMap::new(),
        }
    }
}

impl CliConfig {
    /// Path of the credentials file.
    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir.join(DEFAULT_FILE_NAME)
    }

    /// OAuth client settings for a vendor.
    pub fn vendor(&self, vendor: &str) -> Result<AuthConfig> {
        self.vendors.get(vendor).cloned().with_context(|| {
            format!(
                "No [vendors.{}] section in {:?}; add client_id and redirect_uri there",
                vendor, self.config_path
            )
        })
    }

    /// A vendor's endpoint table with any configured overrides applied.
    pub fn endpoints_for(&self, table: EndpointTable) -> EndpointTable {
        match self.endpoints.get(table.id.as_str()) {
            Some(overrides) => overrides.apply(table),
            None => table,
        }
    }
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    project_dirs()
        .map(|d| d.config_dir().join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from("apiforge.toml"))
}

/// Load configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    let mut config = if config_path.exists() {
        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))?
    } else {
        CliConfig::default()
    };

    config.config_path = config_path;

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", config.data_dir))?;

    Ok(config)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "apiforge", "apiforge")
}
