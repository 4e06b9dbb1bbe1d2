use oasis_core::DEFAULT_COUNTRIES_URL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "oasis.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountriesConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `plain` or `json`
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub database: Option<DatabaseConfig>,
    pub countries: Option<CountriesConfig>,
    pub log: Option<LogConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No database url: set DATABASE_URL or [database] url")]
    MissingDatabaseUrl,
    #[error("Invalid countries url {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
}

impl AppConfig {
    /// Load configuration from the OASIS_CONFIG path (TOML) if present, with defaults otherwise
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("OASIS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_path(path)
    }

    /// Parse `path`; a missing file yields the defaults
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        let s = fs::read_to_string(path)?;
        Ok(toml::from_str::<AppConfig>(&s)?)
    }

    /// Connection string, DATABASE_URL winning over the file
    pub fn database_url(&self) -> Result<String, ConfigError> {
        self.database_url_or(std::env::var("DATABASE_URL").ok())
    }

    fn database_url_or(&self, env_override: Option<String>) -> Result<String, ConfigError> {
        env_override
            .filter(|url| !url.is_empty())
            .or_else(|| self.database.as_ref().and_then(|d| d.url.clone()))
            .ok_or(ConfigError::MissingDatabaseUrl)
    }

    /// Pool size (default 10)
    pub fn max_connections(&self) -> u32 {
        self.database
            .as_ref()
            .and_then(|d| d.max_connections)
            .unwrap_or(10)
    }

    /// Pool acquire timeout (default 30s)
    pub fn acquire_timeout(&self) -> Duration {
        let secs = self
            .database
            .as_ref()
            .and_then(|d| d.acquire_timeout_secs)
            .unwrap_or(30);
        Duration::from_secs(secs)
    }

    pub fn countries_url(&self) -> Result<Url, ConfigError> {
        let raw = self
            .countries
            .as_ref()
            .and_then(|c| c.url.clone())
            .unwrap_or_else(|| DEFAULT_COUNTRIES_URL.to_string());
        Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { url: raw, source })
    }

    /// Log output format (default `plain`)
    pub fn log_format(&self) -> &str {
        self.log
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .unwrap_or("plain")
    }
}
