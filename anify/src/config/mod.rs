//! Configuration management for the search gateway
//!
//! Default config location: ./anify.toml
//!
//! Values from the file can be overridden by the environment variables the
//! gateway has always been deployed with (`USE_MEILISEARCH`, `MEILISEARCH_URL`,
//! `MEILISEARCH_KEY`, `BACKEND_URL`, `API_KEY`).

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// Primary full-text index
    #[serde(default)]
    pub meilisearch: MeilisearchConfig,
    /// Secondary backend used as fallback
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Maximum request body size in bytes (default: 1MB)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3060".to_string()
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cors: CorsConfig::default(),
            max_body_size: default_max_body_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Allowed origins. Use "*" for any origin, or list specific origins.
    #[serde(default = "default_cors_origins")]
    pub origins: Vec<String>,
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: default_cors_origins(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MeilisearchConfig {
    /// Query the index before the backend (USE_MEILISEARCH)
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_meilisearch_url")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Treat an index response without hits as a miss and ask the backend.
    /// When false, the empty page is returned as-is.
    #[serde(default = "default_true")]
    pub fallback_on_empty: bool,
}

fn default_meilisearch_url() -> String {
    "http://localhost:7700".to_string()
}

impl Default for MeilisearchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_meilisearch_url(),
            key: None,
            timeout_ms: default_timeout_ms(),
            fallback_on_empty: true,
        }
    }
}

impl MeilisearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,
    /// Sent as the `apikey` query parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Bearer token for the Authorization header.
    /// Falls back to the Meilisearch key when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_backend_url() -> String {
    "https://api.anify.tv".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            api_key: None,
            bearer_token: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    30000
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log output format: "pretty" or "json"
    /// Override with LOG_FORMAT env var
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable Prometheus metrics at GET /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_level() -> String {
    "info,anify=debug".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            metrics_enabled: true,
        }
    }
}

/// Treat empty strings from env or TOML as "not set"
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load config from file path, or create default
    pub fn load_or_create(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.normalize();
            Ok(config)
        } else {
            let config = Config::default();
            // Try to save default config
            if let Some(parent) = config_path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let _ = config.save(config_path);
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// `USE_MEILISEARCH` only enables the index when it is exactly `"true"`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(flag) = lookup("USE_MEILISEARCH") {
            self.meilisearch.enabled = flag.trim() == "true";
        }
        if let Some(url) = non_empty(lookup("MEILISEARCH_URL")) {
            self.meilisearch.url = url;
        }
        if let Some(key) = non_empty(lookup("MEILISEARCH_KEY")) {
            self.meilisearch.key = Some(key);
        }
        if let Some(url) = non_empty(lookup("BACKEND_URL")) {
            self.backend.url = url;
        }
        if let Some(key) = non_empty(lookup("API_KEY")) {
            self.backend.api_key = Some(key);
        }
        if let Some(token) = non_empty(lookup("BACKEND_BEARER_TOKEN")) {
            self.backend.bearer_token = Some(token);
        }
        if let Some(addr) = non_empty(lookup("ANIFY_BIND_ADDR")) {
            self.server.bind_addr = addr;
        }
        if let Some(format) = non_empty(lookup("LOG_FORMAT")) {
            self.observability.log_format = format;
        }
        self.normalize();
    }

    /// Check URLs before any client is built
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.backend.url)
            .map_err(|e| anyhow!("Invalid backend.url '{}': {}", self.backend.url, e))?;
        if self.meilisearch.enabled {
            url::Url::parse(&self.meilisearch.url).map_err(|e| {
                anyhow!("Invalid meilisearch.url '{}': {}", self.meilisearch.url, e)
            })?;
        }
        Ok(())
    }

    /// Bearer token sent to the backend
    pub fn backend_bearer(&self) -> Option<&str> {
        self.backend
            .bearer_token
            .as_deref()
            .or(self.meilisearch.key.as_deref())
    }

    fn normalize(&mut self) {
        self.meilisearch.key = non_empty(self.meilisearch.key.take());
        self.backend.api_key = non_empty(self.backend.api_key.take());
        self.backend.bearer_token = non_empty(self.backend.bearer_token.take());
    }
}
