use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application configuration (saved to config.toml in the config directory)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    /// Base URL of the DVR server, e.g. `https://dvr.example.com/`
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Maximum simultaneously active transfers. Protects the server and
    /// local sockets/file handles from unbounded parallelism.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_max_concurrent() -> usize {
    30
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl Config {
    /// Load configuration from the config directory. A missing file yields
    /// the defaults.
    pub fn load() -> Result<Self> {
        let path = crate::util::paths::get_config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the config directory (temp file + rename).
    pub fn save(&self) -> Result<()> {
        let path = crate::util::paths::get_config_path()?;
        let toml = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let temp_path = path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml)
            .with_context(|| format!("Failed to write config file {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to replace config file {}", path.display()))?;
        Ok(())
    }
}
