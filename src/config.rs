//! Configuration loader and validator for the preview service.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub cache: CacheConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
}

/// Server-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub bind_addr: String,
    pub data_dir: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

/// Ephemeral cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    #[serde(default)]
    pub redis_url: Option<String>,
    pub ttl_seconds: u64,
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

/// Metadata fetcher settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetcherConfig {
    pub timeout_seconds: u64,
    pub max_body_bytes: usize,
    pub user_agent: String,
}

fn default_max_capacity() -> u64 {
    crate::cache::DEFAULT_CAPACITY
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: crate::fetcher::DEFAULT_TIMEOUT.as_secs(),
            max_body_bytes: crate::fetcher::DEFAULT_MAX_BODY_BYTES,
            user_agent: crate::fetcher::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// `DATABASE_URL` if set, otherwise a SQLite file under `app.data_dir`.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            format!(
                "sqlite://{}/og_preview.db?mode=rwc",
                self.app.data_dir.trim_end_matches('/')
            )
        })
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.bind_addr.trim().is_empty() {
        return Err(ConfigError::Invalid("app.bind_addr must be non-empty"));
    }
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.allowed_origins.iter().any(|o| o.trim().is_empty()) {
        return Err(ConfigError::Invalid("app.allowed_origins entries must be non-empty"));
    }

    if cfg.cache.ttl_seconds == 0 {
        return Err(ConfigError::Invalid("cache.ttl_seconds must be > 0"));
    }
    if cfg.cache.max_capacity == 0 {
        return Err(ConfigError::Invalid("cache.max_capacity must be > 0"));
    }
    if cfg.cache.backend == CacheBackend::Redis
        && cfg.cache.redis_url.as_deref().map_or(true, |u| u.trim().is_empty())
    {
        return Err(ConfigError::Invalid(
            "cache.redis_url is required when cache.backend is redis",
        ));
    }

    if cfg.fetcher.timeout_seconds == 0 {
        return Err(ConfigError::Invalid("fetcher.timeout_seconds must be > 0"));
    }
    if cfg.fetcher.max_body_bytes == 0 {
        return Err(ConfigError::Invalid("fetcher.max_body_bytes must be > 0"));
    }
    if cfg.fetcher.user_agent.trim().is_empty() {
        return Err(ConfigError::Invalid("fetcher.user_agent must be non-empty"));
    }

    Ok(())
}

/// Returns the example YAML configuration.
pub fn example() -> &'static str {
    r#"app:
  bind_addr: "127.0.0.1:8000"
  data_dir: "./data"
  allowed_origins:
    - "http://localhost:5173"
    - "http://127.0.0.1:5173"

cache:
  backend: redis
  redis_url: "redis://127.0.0.1:6379/0"
  ttl_seconds: 300
  max_capacity: 10000

fetcher:
  timeout_seconds: 10
  max_body_bytes: 1048576
  user_agent: "og-preview/0.1"
"#
}
