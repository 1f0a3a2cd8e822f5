use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::escalation::DEFAULT_MAX_PACKET_LOSS;
use crate::probe::DEFAULT_PROBE_TIMEOUT_SECS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub target: String,
    pub max_packet_loss: f64,
    pub ping_count: Option<u32>,
    pub probe_timeout_secs: u64,
    pub records_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target: "8.8.8.8".to_string(),
            max_packet_loss: DEFAULT_MAX_PACKET_LOSS,
            ping_count: None,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            records_file: None,
        }
    }
}

impl AppConfig {
    pub fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("InternetTroubleshooter");

        fs::create_dir_all(&config_dir)?;
        Ok(config_dir.join("config.json"))
    }

    /// Reads the user's config, falling back to defaults when it is missing or broken.
    pub fn load() -> Self {
        match Self::get_config_path() {
            Ok(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                warn!("ignoring config {}: {e}", path.display());
                AppConfig::default()
            }),
            Ok(path) => {
                debug!("no config at {}, using defaults", path.display());
                AppConfig::default()
            }
            Err(e) => {
                warn!("failed to get config path: {e}");
                AppConfig::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::get_config_path()?;
        self.save_to(&path)?;
        debug!("saved config to {}", path.display());
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
