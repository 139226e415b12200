use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "vocab-review";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub log_level: Option<String>,
    pub database_path: PathBuf,
    pub session: SessionConfig,
    pub stats: StatsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cards per review batch when the caller does not pass a limit
    pub default_limit: i64,
    /// Upper bound on any single card store call; unbounded when absent
    pub store_timeout_ms: Option<u64>,
}

impl SessionConfig {
    pub fn store_timeout(&self) -> Option<Duration> {
        self.store_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            store_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Repetitions at which a card counts as mature rather than learning
    pub mastery_threshold: u32,
    /// Cards with an easiness factor at or above this are easy
    pub easy_min_ef: f64,
    /// Cards with an easiness factor below this are hard
    pub hard_max_ef: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            mastery_threshold: 5,
            easy_min_ef: 2.5,
            hard_max_ef: 2.0,
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            database_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_NAME)
                .join("vocab.sqlite3"),
            session: SessionConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl ReviewConfig {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()));
        }

        // Primary location: ~/.config/vocab-review/vocab-review.yml
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(APP_NAME).join(format!("{}.yml", APP_NAME));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        let fallback_config = PathBuf::from(format!("{}.yml", APP_NAME));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}
