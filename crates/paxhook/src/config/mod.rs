use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HookError, Result};

/// Main configuration structure for the paxhook daemon
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP proxy configuration
    #[serde(default)]
    pub proxy: ProxyConfig,
    /// Retry policy for provider calls
    #[serde(default)]
    pub retry: RetryConfig,
    /// Where provider settings are persisted
    #[serde(default)]
    pub settings: SettingsConfig,
}

impl Config {
    /// Load from an explicit path, or the first default location that exists
    ///
    /// Default locations: `~/.paxhook/config.toml`, the platform config dir,
    /// then `./config.toml`. With none present, defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let default_paths = [
            dirs::home_dir().map(|h| h.join(".paxhook").join("config.toml")),
            dirs::config_dir().map(|c| c.join("paxhook").join("config.toml")),
            Some(PathBuf::from("config.toml")),
        ];

        for candidate in default_paths.iter().flatten() {
            if candidate.exists() {
                return Self::from_file(candidate);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::info!("Loading config from: {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            HookError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| HookError::Config(format!("Failed to parse config: {e}")))
    }
}

/// HTTP proxy server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Address to listen on (e.g., "127.0.0.1:8787")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Game backend origin that non-`/p/` requests are forwarded to
    #[serde(default)]
    pub upstream_url: Option<String>,
    /// Allowed upstream hosts (empty = allow all)
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
    /// Passthrough request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// URL fragment identifying the game's chat endpoint
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            upstream_url: None,
            allowed_hosts: Vec::new(),
            timeout_secs: default_timeout_secs(),
            chat_path: default_chat_path(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_chat_path() -> String {
    "/api/simple-chat".to_string()
}

/// Retry and timeout policy for provider calls
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per provider call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each later attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound for a single provider attempt in seconds
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_attempt_timeout_secs() -> u64 {
    120
}

/// Location of the provider settings file
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsConfig {
    #[serde(default = "default_settings_path")]
    pub path: PathBuf,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: default_settings_path(),
        }
    }
}

impl SettingsConfig {
    /// `path` with a leading `~/` expanded to the home directory
    pub fn resolved_path(&self) -> PathBuf {
        match (self.path.strip_prefix("~"), dirs::home_dir()) {
            (Ok(rest), Some(home)) => home.join(rest),
            _ => self.path.clone(),
        }
    }
}

fn default_settings_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".paxhook").join("settings.toml"))
        .unwrap_or_else(|| PathBuf::from(".paxhook/settings.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.proxy.listen_addr, "127.0.0.1:8787");
        assert_eq!(config.proxy.chat_path, "/api/simple-chat");
        assert!(config.proxy.upstream_url.is_none());
        assert!(config.proxy.allowed_hosts.is_empty());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay(), Duration::from_secs(1));
        assert!(config.settings.path.ends_with("settings.toml"));
    }

    #[test]
    fn test_config_partial_toml() {
        let toml_str = r#"
            [proxy]
            upstream_url = "https://paxhistoria.co"
            allowed_hosts = ["paxhistoria.co", "*.paxhistoria.co"]

            [retry]
            max_attempts = 5
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.proxy.upstream_url.as_deref(),
            Some("https://paxhistoria.co")
        );
        assert_eq!(config.proxy.allowed_hosts.len(), 2);
        assert_eq!(config.proxy.timeout_secs, 300);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.retry.attempt_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_config_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.proxy.listen_addr, "127.0.0.1:8787");
        assert_eq!(config.retry.attempt_timeout_secs, 120);
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[proxy]\nchat_path = \"/api/chat\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.proxy.chat_path, "/api/chat");
    }

    #[test]
    fn test_config_missing_explicit_file_is_error() {
        let err = Config::load(Some(Path::new("/nonexistent/paxhook.toml"))).unwrap_err();
        assert!(matches!(err, HookError::Config(_)));
    }

    #[test]
    fn test_config_custom_settings_path() {
        let toml_str = r#"
            [settings]
            path = "/tmp/paxhook-settings.toml"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.settings.path, PathBuf::from("/tmp/paxhook-settings.toml"));
        assert_eq!(config.settings.resolved_path(), config.settings.path);
    }

    #[test]
    fn test_settings_path_expands_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let settings = SettingsConfig {
            path: PathBuf::from("~/.paxhook/settings.toml"),
        };
        assert_eq!(settings.resolved_path(), home.join(".paxhook/settings.toml"));
    }
}
