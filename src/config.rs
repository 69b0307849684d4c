use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub thumbnails: ThumbnailConfig,

    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    #[serde(default = "default_thumb_width")]
    pub max_width: u32,

    #[serde(default = "default_thumb_height")]
    pub max_height: u32,
}

fn default_thumb_width() -> u32 {
    crate::thumbnails::THUMBNAIL_WIDTH
}

fn default_thumb_height() -> u32 {
    crate::thumbnails::THUMBNAIL_HEIGHT
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_width: default_thumb_width(),
            max_height: default_thumb_height(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Seed file consumed once when the store is empty. None disables
    /// sample data.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_seed_trips")]
    pub max_trips: usize,
}

fn default_max_seed_trips() -> usize {
    crate::seed::DEFAULT_MAX_SEED_TRIPS
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_trips: default_max_seed_trips(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("triplog")
        .join("triplog.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            thumbnails: ThumbnailConfig::default(),
            seed: SeedConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // Create default config
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("triplog")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}
