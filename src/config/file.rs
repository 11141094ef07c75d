//! Configuration file handling

use super::{ChainFilter, DEFAULT_FRESHNESS_DAYS, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECS};
use crate::error::{ConfigError, Result};
use crate::status::DEFAULT_STATUS_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Registry checkout to operate on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_root: Option<PathBuf>,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Chain and provider selection
    #[serde(default)]
    pub filter: FilterSettings,
}

/// Global settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Number of concurrent workers (0 = twice the CPU count)
    #[serde(default)]
    pub workers: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Freshness window in days
    #[serde(default = "default_freshness_days")]
    pub freshness_days: u64,

    /// Read attempts before a record update is abandoned
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Remote status source base URL
    #[serde(default = "default_status_url")]
    pub status_url: String,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_freshness_days() -> u64 {
    DEFAULT_FRESHNESS_DAYS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_status_url() -> String {
    DEFAULT_STATUS_URL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workers: 0,
            timeout_seconds: default_timeout(),
            freshness_days: default_freshness_days(),
            max_attempts: default_max_attempts(),
            status_url: default_status_url(),
        }
    }
}

/// Chain and provider selection from file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Extra folders that are not chains
    #[serde(default)]
    pub ignore_folders: Vec<String>,

    /// Chains to skip
    #[serde(default)]
    pub ignore_chains: Vec<String>,

    /// Only consider these chains
    #[serde(default)]
    pub chains: Vec<String>,

    /// Only consider endpoints from these providers
    #[serde(default)]
    pub providers: Vec<String>,
}

impl FilterSettings {
    /// Build the runtime filter on top of the default ignore list
    pub fn to_filter(&self) -> ChainFilter {
        ChainFilter::new()
            .ignore_folders(self.ignore_folders.iter().cloned())
            .ignore_chains(self.ignore_chains.iter().cloned())
            .only_chains(self.chains.iter().cloned())
            .only_providers(self.providers.iter().cloned())
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("registry-pruner")
            .join("config.toml")
    }

    /// Load from default path
    pub fn load_default() -> Result<Option<Self>> {
        let path = Self::default_path();
        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Load from a specific path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::InvalidFile(format!("{}: {}", path.display(), e)))?;

        let config: Self = toml::from_str(&content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Save to a specific path
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::InvalidFile(format!("Failed to create directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidFile(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::InvalidFile(format!("Failed to write config: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
registry_root = "/srv/chain-registry"

[settings]
workers = 16
timeout_seconds = 5
freshness_days = 30

[filter]
ignore_chains = ["cosmoshub"]
providers = ["Polkachu"]
"#;

        let config: ConfigFile = toml::from_str(toml).unwrap();
        assert_eq!(
            config.registry_root,
            Some(PathBuf::from("/srv/chain-registry"))
        );
        assert_eq!(config.settings.workers, 16);
        assert_eq!(config.settings.timeout_seconds, 5);
        assert_eq!(config.settings.freshness_days, 30);
        assert_eq!(config.settings.max_attempts, 25);
        assert_eq!(config.settings.status_url, DEFAULT_STATUS_URL);

        let filter = config.filter.to_filter();
        assert!(!filter.allows_folder("cosmoshub"));
        assert!(filter.allows_folder("osmosis"));
        assert!(!filter.allows_folder("_IBC"));
        assert!(filter.allows_provider(Some("Polkachu")));
        assert!(!filter.allows_provider(Some("forbole")));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ConfigFile = toml::from_str("").unwrap();
        assert!(config.registry_root.is_none());
        assert_eq!(config.settings.timeout_seconds, 10);
        assert_eq!(config.settings.freshness_days, 10);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ConfigFile::default();
        config.settings.freshness_days = 7;
        config.filter.ignore_chains = vec!["juno".to_string()];
        config.save(&path).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.settings.freshness_days, 7);
        assert_eq!(loaded.filter.ignore_chains, vec!["juno".to_string()]);
    }

    #[test]
    fn test_default_path() {
        let path = ConfigFile::default_path();
        assert!(path.to_string_lossy().contains("registry-pruner"));
    }
}
