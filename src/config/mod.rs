//! Configuration management module
//!
//! Handles loading, validation, and management of application configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Logging level
    pub log_level: String,

    /// File-based logging configuration
    pub log: LogConfig,

    /// SimArena server endpoints
    pub server: ServerConfig,

    /// Stored interface language
    pub locale: LocaleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// REST API base URL
    pub rest_url: String,

    /// WebSocket base URL
    pub ws_url: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Absolute or relative path to the rolling log file
    pub file_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocaleConfig {
    /// File holding the persisted locale code
    pub file_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log: LogConfig::default(),
            server: ServerConfig::default(),
            locale: LocaleConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rest_url: "http://localhost:8080/api".to_string(),
            ws_url: "ws://localhost:8080/api".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_path: "logs/simarena.log".to_string(),
        }
    }
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            file_path: ".simarena-locale".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::parse_file(path.as_ref())?;

        config.apply_env_overrides();

        config.validate()?;
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration, using defaults when the file does not exist.
    ///
    /// An existing file that fails to parse or validate is an error, and so
    /// are defaults made invalid by environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with(path, |key| env::var(key).ok())
    }

    fn load_with<P: AsRef<Path>>(
        path: P,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let mut config = Self::parse_file(path)?;
            config.apply_overrides(lookup);
            config
                .validate()
                .with_context(|| format!("Invalid config file: {}", path.display()))?;
            return Ok(config);
        }

        let mut config = Self::default();
        config.apply_overrides(lookup);
        config
            .validate()
            .context("Invalid configuration from environment overrides")?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // SIMARENA_LOG_LEVEL - logging level
        if let Some(log_level) = lookup("SIMARENA_LOG_LEVEL") {
            self.log_level = log_level;
        }

        // SIMARENA_LOG_FILE_PATH - logging destination file
        if let Some(file_path) = lookup("SIMARENA_LOG_FILE_PATH") {
            if !file_path.trim().is_empty() {
                self.log.file_path = file_path;
            }
        }

        // SIMARENA_REST_URL - REST API URL
        if let Some(rest_url) = lookup("SIMARENA_REST_URL") {
            self.server.rest_url = rest_url;
        }

        // SIMARENA_WS_URL - WebSocket URL
        if let Some(ws_url) = lookup("SIMARENA_WS_URL") {
            self.server.ws_url = ws_url;
        }

        // SIMARENA_TIMEOUT_SECONDS - request timeout
        if let Some(timeout) = lookup("SIMARENA_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.server.timeout_seconds = value;
            }
        }

        // SIMARENA_LOCALE_FILE - persisted locale location
        if let Some(file_path) = lookup("SIMARENA_LOCALE_FILE") {
            if !file_path.trim().is_empty() {
                self.locale.file_path = file_path;
            }
        }
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let rest_url = self.server.rest_url.trim();
        if !(rest_url.starts_with("http://") || rest_url.starts_with("https://")) {
            anyhow::bail!("server.rest_url must be an http(s) URL: {}", rest_url);
        }

        let ws_url = self.server.ws_url.trim();
        if !(ws_url.starts_with("ws://") || ws_url.starts_with("wss://")) {
            anyhow::bail!("server.ws_url must be a ws(s) URL: {}", ws_url);
        }

        if self.server.timeout_seconds == 0 {
            anyhow::bail!("Timeout must be greater than 0");
        }

        if self.log.file_path.trim().is_empty() {
            anyhow::bail!("Log file path must not be empty");
        }

        if self.locale.file_path.trim().is_empty() {
            anyhow::bail!("Locale file path must not be empty");
        }

        Ok(())
    }

    /// Display formatted configuration
    pub fn display(&self) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        println!("{}", content);
        Ok(())
    }
}
