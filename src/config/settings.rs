//! Application and dashboard configuration

use anyhow::Result;
use rt_board_types::{EntityOption, WidgetRecord};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the config format
    pub version: u32,
    /// Runtime tuning knobs
    #[serde(default)]
    pub tuning: TuningConfig,
    /// Dashboards configuration
    #[serde(default)]
    pub dashboards: Vec<DashboardConfig>,
}

impl AppConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "github.rt_board", "rt-board")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.json"))
    }

    /// Load configuration from a specific file path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a specific file path
    pub fn save_to_path(&self, path: &PathBuf) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn dashboard(&self, id: &str) -> Option<&DashboardConfig> {
        self.dashboards.iter().find(|d| d.id == id)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            tuning: TuningConfig::default(),
            dashboards: Vec::new(),
        }
    }
}

fn default_batch_window_ms() -> u64 {
    200
}

fn default_fetch_window_ms() -> u64 {
    300
}

/// Runtime tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningConfig {
    /// Coalescing window for transport change batches
    #[serde(default = "default_batch_window_ms")]
    pub batch_window_ms: u64,
    /// Debounce window for widget status fetches
    #[serde(default = "default_fetch_window_ms")]
    pub fetch_window_ms: u64,
    /// REST backend base URL; unset means the simulated provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_url: Option<String>,
}

impl TuningConfig {
    pub fn batch_window(&self) -> Duration {
        Duration::from_millis(self.batch_window_ms)
    }

    pub fn fetch_window(&self) -> Duration {
        Duration::from_millis(self.fetch_window_ms)
    }
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            batch_window_ms: default_batch_window_ms(),
            fetch_window_ms: default_fetch_window_ms(),
            provider_url: None,
        }
    }
}

/// Grid settings for one drawing board
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridConfig {
    pub columns: u32,
    pub rows: u32,
    /// Cell edge length in pixels
    pub cell_size: u32,
    pub spacing: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 12,
            rows: 8,
            cell_size: 96,
            spacing: 8,
        }
    }
}

/// One drawing board: layout, seeded entity options, and widget records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub grid: GridConfig,
    /// Entity options seeded into the registry snapshot on session open
    #[serde(default)]
    pub entities: Vec<EntityOption>,
    #[serde(default)]
    pub widgets: Vec<WidgetRecord>,
}
