//! Configuration loading for querylog.
//! Reads querylog.toml from the current directory or the path in QUERY_LOG_CONFIG,
//! then applies the QUERY_LOG* environment toggles on top.

use querylog_common::{LogFormat, QueryLogError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "querylog.toml";

pub const ENV_CONFIG_PATH: &str = "QUERY_LOG_CONFIG";
pub const ENV_ENABLED: &str = "QUERY_LOG";
pub const ENV_FORMAT: &str = "QUERY_LOG_FORMAT";
pub const ENV_PRETTY: &str = "QUERY_LOG_PRETTY";
pub const ENV_ENVIRONMENT: &str = "QUERY_LOG_ENV";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Master switch for query capture.
    #[serde(default)]
    pub enabled: bool,

    /// Persistence format. Only "json" is accepted.
    #[serde(default = "default_format")]
    pub format: String,

    /// Pretty-print the JSON array on disk.
    #[serde(default)]
    pub pretty: bool,

    /// Frames under this directory count as application code.
    #[serde(default = "default_app_root")]
    pub app_root: PathBuf,

    /// Base directory for the dated log tree.
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,

    /// Log-level path segment, e.g. "info" in storage/logs/info/2024-05/...
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Deployment environment name stamped on every record.
    #[serde(default)]
    pub environment: Option<String>,

    /// Static metadata merged into every batch.
    #[serde(default)]
    pub meta_data: Map<String, Value>,
}

fn default_format()       -> String  { LogFormat::Json.as_str().to_string() }
fn default_app_root()     -> PathBuf { PathBuf::from("src") }
fn default_storage_root() -> PathBuf { PathBuf::from("storage/logs") }
fn default_log_level()    -> String  { "info".to_string() }

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: false,
            format: default_format(),
            pretty: false,
            app_root: default_app_root(),
            storage_root: default_storage_root(),
            log_level: default_log_level(),
            environment: None,
            meta_data: Map::new(),
        }
    }
}


impl Config {
    /// Load configuration from querylog.toml plus environment overrides.
    /// Checks QUERY_LOG_CONFIG env var first, then current directory.
    /// A missing file is not an error; capture then depends on the env toggles alone.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let mut config = Self::from_file_or_default(Path::new(&path))?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse `path` if it exists, otherwise start from defaults.
    pub fn from_file_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No query log config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply the QUERY_LOG* toggles using `lookup` as the environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_ENABLED) {
            self.enabled = parse_bool(ENV_ENABLED, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FORMAT) {
            self.format = raw.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_PRETTY) {
            self.pretty = parse_bool(ENV_PRETTY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_ENVIRONMENT) {
            let raw = raw.trim();
            self.environment = (!raw.is_empty()).then(|| raw.to_string());
        }
        Ok(())
    }

    /// Startup checks. An unsupported format is fatal even while capture is disabled.
    pub fn validate(&self) -> Result<()> {
        self.log_format()?;
        if self.log_level.trim().is_empty() {
            return Err(QueryLogError::Config("log_level must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn log_format(&self) -> Result<LogFormat> {
        self.format.parse()
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(QueryLogError::Config(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}
