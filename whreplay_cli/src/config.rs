//! CLI configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use whreplay_common::constants;

/// Get the configuration directory path
pub fn config_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("whreplay")
    }

    #[cfg(not(target_os = "windows"))]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".whreplay")
    }
}

/// Get the config file path
pub fn config_file() -> PathBuf {
    config_dir().join("config.yml")
}

/// Get the logs directory
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}

/// Log file used while the dashboard owns the terminal
pub fn tui_log_file() -> PathBuf {
    logs_dir().join("whreplay.log")
}

/// Ensure all config directories exist
pub fn ensure_dirs() -> Result<()> {
    let config = config_dir();
    let logs = logs_dir();

    fs::create_dir_all(&config).context("Failed to create config directory")?;
    fs::create_dir_all(&logs).context("Failed to create logs directory")?;

    Ok(())
}

/// Main configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Replay backend URL (default: http://localhost:5000)
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Identity cookie values issued by `/register`, keyed by backend URL
    #[serde(default)]
    pub idents: BTreeMap<String, String>,

    /// Last destination used for replays
    #[serde(default)]
    pub replay_url: Option<String>,

    /// `--server` / `WHREPLAY_SERVER` for this run only
    #[serde(skip)]
    server_override: Option<String>,
}

fn default_server_url() -> String {
    constants::DEV_SERVER_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            idents: BTreeMap::new(),
            replay_url: None,
            server_override: None,
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file())
    }

    fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        ensure_dirs()?;
        self.save_to(&config_file())
    }

    fn save_to(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Apply a `--server` override. The saved `server_url` is left alone.
    pub fn with_server(mut self, server: Option<String>) -> Self {
        self.server_override = server;
        self
    }

    /// Backend base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.server_override
            .as_deref()
            .unwrap_or(&self.server_url)
            .trim_end_matches('/')
    }

    /// Identity for the current backend
    pub fn ident(&self) -> Option<&str> {
        self.idents.get(self.base_url()).map(String::as_str)
    }

    /// Custom capture URL, once an identity is known
    pub fn custom_url(&self) -> Option<String> {
        self.ident()
            .map(|ident| whreplay_common::custom_url(self.base_url(), ident))
    }

    /// Remember an identity for the current backend.
    /// Returns false if it was already known.
    pub fn set_ident(&mut self, ident: String) -> bool {
        if self.ident() == Some(ident.as_str()) {
            return false;
        }
        let key = self.base_url().to_string();
        self.idents.insert(key, ident);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_missing() {
        let path = std::env::temp_dir().join("whreplay-test-missing-config.yml");
        let _ = fs::remove_file(&path);

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.base_url(), "http://localhost:5000");
        assert_eq!(config.custom_url(), None);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("whreplay-test-config-{}.yml", std::process::id()));

        let mut config = Config::default();
        config.server_url = "https://hooks.example.org/replay/".to_string();
        assert!(config.set_ident("abc123".to_string()));
        assert!(!config.set_ident("abc123".to_string()));
        config.replay_url = Some("https://example.org/in".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded, config);
        assert_eq!(loaded.base_url(), "https://hooks.example.org/replay");
        assert_eq!(
            loaded.custom_url().as_deref(),
            Some("https://hooks.example.org/replay/create/abc123/")
        );
    }

    #[test]
    fn test_identity_is_per_server() {
        let mut config = Config::default();
        config.set_ident("local".to_string());

        let mut other = config.clone().with_server(Some("https://other.example.org/".into()));
        assert_eq!(other.base_url(), "https://other.example.org");
        assert_eq!(other.ident(), None);

        other.set_ident("remote".to_string());
        assert_eq!(other.ident(), Some("remote"));
        assert_eq!(
            other.custom_url().as_deref(),
            Some("https://other.example.org/create/remote/")
        );

        // The override is never written back
        let saved = serde_yaml::to_string(&other).unwrap();
        let reloaded: Config = serde_yaml::from_str(&saved).unwrap();
        assert_eq!(reloaded.server_url, "http://localhost:5000");
        assert_eq!(reloaded.ident(), Some("local"));
        assert_eq!(
            reloaded.idents.get("https://other.example.org").map(String::as_str),
            Some("remote")
        );
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config =
            serde_yaml::from_str("idents:\n  http://localhost:5000: xyz\n").unwrap();
        assert_eq!(config.server_url, "http://localhost:5000");
        assert_eq!(config.ident(), Some("xyz"));
        assert_eq!(config.replay_url, None);
    }
}
