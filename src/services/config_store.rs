// Configuration Storage Service
// Handles config file read/write, version backup and environment overrides

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub version: String,
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    pub enabled: bool,
    pub http: Option<String>,
    pub https: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Unified confidence at or above which a verdict is actionable.
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
    /// Longest accepted input, in characters. Longer input is rejected, never truncated.
    #[serde(default = "default_max_length")]
    pub max_message_length: usize,
    #[serde(default = "default_timeout_secs")]
    pub model_timeout_secs: u64,
    /// Number of prior messages forwarded to the semantic layer.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            max_message_length: 4000,
            model_timeout_secs: 30,
            context_window: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: default_model(),
            temperature: 0.3,
            max_tokens: 1000,
        }
    }
}

fn default_threshold() -> f64 { 0.7 }
fn default_max_length() -> usize { 4000 }
fn default_timeout_secs() -> u64 { 30 }
fn default_context_window() -> usize { 5 }
fn default_model() -> String { "gpt-4-turbo-preview".to_string() }
fn default_temperature() -> f64 { 0.3 }
fn default_max_tokens() -> u32 { 1000 }

impl AppConfig {
    /// Apply `OPENAI_*` / analysis overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Unparseable values are ignored with a warning.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(model) = get("OPENAI_MODEL") {
            self.provider.model = model;
        }
        if let Some(url) = get("OPENAI_API_URL") {
            self.provider.base_url = Some(url);
        }
        if let Some(raw) = get("ANALYSIS_THRESHOLD") {
            match raw.parse::<f64>() {
                Ok(v) if (0.0..=1.0).contains(&v) => self.analysis.confidence_threshold = v,
                _ => warn!("[CONFIG] ignoring ANALYSIS_THRESHOLD={}", raw),
            }
        }
        if let Some(raw) = get("MAX_MESSAGE_LENGTH") {
            match raw.parse::<usize>() {
                Ok(v) if v > 0 => self.analysis.max_message_length = v,
                _ => warn!("[CONFIG] ignoring MAX_MESSAGE_LENGTH={}", raw),
            }
        }
        if let Some(raw) = get("MODEL_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(v) if v > 0 => self.analysis.model_timeout_secs = v,
                _ => warn!("[CONFIG] ignoring MODEL_TIMEOUT_SECS={}", raw),
            }
        }
    }
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cognibot"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir).map_err(|source| ConfigError::Io {
            action: "create",
            path: self.config_dir.clone(),
            source,
        })
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file).map_err(|source| ConfigError::Io {
            action: "read",
            path: self.config_file.clone(),
            source,
        })?;

        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.ensure_dir()?;

        // Create backup if file exists
        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)?;

        fs::write(&self.config_file, content).map_err(|source| ConfigError::Io {
            action: "write",
            path: self.config_file.clone(),
            source,
        })
    }

    /// Create a backup of current config
    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir).map_err(|source| ConfigError::Io {
            action: "create",
            path: backup_dir.clone(),
            source,
        })?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file).map_err(|source| ConfigError::Io {
            action: "back up",
            path: backup_file.clone(),
            source,
        })?;

        // Keep only last 10 backups
        self.cleanup_old_backups(&backup_dir, 10)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), ConfigError> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|source| ConfigError::Io {
                action: "read",
                path: backup_dir.to_path_buf(),
                source,
            })?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Oldest first; names carry the timestamp so they break mtime ties.
        entries.sort_by_key(|e| {
            (
                e.metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(std::time::SystemTime::UNIX_EPOCH),
                e.file_name(),
            )
        });

        let remove_count = entries.len() - keep;
        for entry in entries.iter().take(remove_count) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    /// Store provider API key in config file
    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.api_keys.insert(provider.to_string(), key.to_string());
        self.save(&config)
    }

    /// Delete provider API key from config file
    pub fn delete_api_key(&self, provider: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.api_keys.remove(provider);
        self.save(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.analysis.confidence_threshold, 0.7);
        assert_eq!(config.analysis.max_message_length, 4000);
        assert_eq!(config.provider.model, "gpt-4-turbo-preview");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"analysis": {"confidenceThreshold": 0.5}}"#).unwrap();
        assert_eq!(parsed.analysis.confidence_threshold, 0.5);
        assert_eq!(parsed.analysis.model_timeout_secs, 30);
        assert_eq!(parsed.provider.max_tokens, 1000);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides_from(|key| match key {
            "OPENAI_MODEL" => Some("gpt-4o-mini".to_string()),
            "ANALYSIS_THRESHOLD" => Some("0.55".to_string()),
            "MAX_MESSAGE_LENGTH" => Some("not-a-number".to_string()),
            "MODEL_TIMEOUT_SECS" => Some(" 12 ".to_string()),
            _ => None,
        });
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.analysis.confidence_threshold, 0.55);
        assert_eq!(config.analysis.max_message_length, 4000);
        assert_eq!(config.analysis.model_timeout_secs, 12);
    }

    #[test]
    fn test_out_of_range_threshold_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides_from(|key| (key == "ANALYSIS_THRESHOLD").then(|| "1.5".to_string()));
        assert_eq!(config.analysis.confidence_threshold, 0.7);
    }

    #[test]
    fn test_store_round_trip_and_backups() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("cognibot"));
        assert_eq!(store.load().unwrap().analysis.context_window, 5);

        store.set_api_key("openai", "sk-test").unwrap();
        assert_eq!(store.load().unwrap().api_keys.get("openai").map(String::as_str), Some("sk-test"));

        for _ in 0..12 {
            store.set_api_key("openai", "sk-rotated").unwrap();
        }
        let backups = std::fs::read_dir(dir.path().join("cognibot").join("backups"))
            .unwrap()
            .count();
        assert!(backups <= 10);

        store.delete_api_key("openai").unwrap();
        let config = store.load().unwrap();
        assert!(!config.api_keys.contains_key("openai"));
        assert_eq!(config.analysis.context_window, 5);
    }
}
