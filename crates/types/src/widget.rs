//! Widget configuration and grid geometry

use crate::entity::EntityBinding;
use crate::status::{Aggregate, TimeRange};
use serde::{Deserialize, Serialize};

/// Position and size of a widget on the drawing board, in grid units
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct WidgetGeometry {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl WidgetGeometry {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Named grid-size presets used to select layout variants.
///
/// Sizes outside the named set fall back to generic styling; classification
/// is a lookup, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridPreset {
    OneByOne,
    OneByTwo,
    TwoByOne,
    TwoByTwo,
    ThreeByThree,
}

impl GridPreset {
    /// Classify a width×height in grid units into a named preset
    pub fn classify(width: u32, height: u32) -> Option<GridPreset> {
        match (width, height) {
            (1, 1) => Some(GridPreset::OneByOne),
            (1, 2) => Some(GridPreset::OneByTwo),
            (2, 1) => Some(GridPreset::TwoByOne),
            (2, 2) => Some(GridPreset::TwoByTwo),
            (3, 3) => Some(GridPreset::ThreeByThree),
            _ => None,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            GridPreset::OneByOne => (1, 1),
            GridPreset::OneByTwo => (1, 2),
            GridPreset::TwoByOne => (2, 1),
            GridPreset::TwoByTwo => (2, 2),
            GridPreset::ThreeByThree => (3, 3),
        }
    }

    /// Get display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            GridPreset::OneByOne => "1×1",
            GridPreset::OneByTwo => "1×2",
            GridPreset::TwoByOne => "2×1",
            GridPreset::TwoByTwo => "2×2",
            GridPreset::ThreeByThree => "3×3",
        }
    }
}

/// Warning/critical thresholds for numeric widgets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ThresholdConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<f64>,
}

fn default_title() -> String {
    "Untitled".to_string()
}

/// Configuration for a gauge widget bound to a single numeric entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeWidgetConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub entities: Vec<EntityBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ThresholdConfig>,
}

impl Default for GaugeWidgetConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            entities: Vec::new(),
            thresholds: None,
        }
    }
}

/// Configuration for a time-series chart widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartWidgetConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub entities: Vec<EntityBinding>,
    #[serde(default)]
    pub time_range: TimeRange,
    #[serde(default)]
    pub aggregate: Aggregate,
}

impl Default for ChartWidgetConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            entities: Vec::new(),
            time_range: TimeRange::default(),
            aggregate: Aggregate::default(),
        }
    }
}

/// Configuration for a status card showing the current value of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCardWidgetConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub entities: Vec<EntityBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ThresholdConfig>,
}

impl Default for StatusCardWidgetConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            entities: Vec::new(),
            thresholds: None,
        }
    }
}

/// Configuration for a table widget driven by several entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableWidgetConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub entities: Vec<EntityBinding>,
}

impl Default for TableWidgetConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            entities: Vec::new(),
        }
    }
}

/// Configuration for a plain text/value widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextWidgetConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub entities: Vec<EntityBinding>,
}

impl Default for TextWidgetConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            entities: Vec::new(),
        }
    }
}

/// Type-safe enum for all widget configurations.
/// Uses serde tag for JSON serialization: {"widget_type": "gauge", ...}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "widget_type")]
pub enum WidgetConfig {
    #[serde(rename = "gauge")]
    Gauge(GaugeWidgetConfig),

    #[serde(rename = "chart")]
    Chart(ChartWidgetConfig),

    #[serde(rename = "status_card")]
    StatusCard(StatusCardWidgetConfig),

    #[serde(rename = "table")]
    Table(TableWidgetConfig),

    #[serde(rename = "text")]
    Text(TextWidgetConfig),
}

impl WidgetConfig {
    /// Get the widget type ID string
    pub fn widget_type(&self) -> &'static str {
        match self {
            WidgetConfig::Gauge(_) => "gauge",
            WidgetConfig::Chart(_) => "chart",
            WidgetConfig::StatusCard(_) => "status_card",
            WidgetConfig::Table(_) => "table",
            WidgetConfig::Text(_) => "text",
        }
    }

    pub fn title(&self) -> &str {
        match self {
            WidgetConfig::Gauge(cfg) => &cfg.title,
            WidgetConfig::Chart(cfg) => &cfg.title,
            WidgetConfig::StatusCard(cfg) => &cfg.title,
            WidgetConfig::Table(cfg) => &cfg.title,
            WidgetConfig::Text(cfg) => &cfg.title,
        }
    }

    /// Ordered entity selection; the first binding is the primary entity
    pub fn entities(&self) -> &[EntityBinding] {
        match self {
            WidgetConfig::Gauge(cfg) => &cfg.entities,
            WidgetConfig::Chart(cfg) => &cfg.entities,
            WidgetConfig::StatusCard(cfg) => &cfg.entities,
            WidgetConfig::Table(cfg) => &cfg.entities,
            WidgetConfig::Text(cfg) => &cfg.entities,
        }
    }

    /// History query parameters for widgets that chart over time
    pub fn history_query(&self) -> Option<(TimeRange, Aggregate)> {
        match self {
            WidgetConfig::Chart(cfg) => Some((cfg.time_range, cfg.aggregate)),
            _ => None,
        }
    }

    pub fn thresholds(&self) -> Option<&ThresholdConfig> {
        match self {
            WidgetConfig::Gauge(cfg) => cfg.thresholds.as_ref(),
            WidgetConfig::StatusCard(cfg) => cfg.thresholds.as_ref(),
            _ => None,
        }
    }
}

/// A placed widget instance on a drawing board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetRecord {
    /// Unique ID for this widget instance
    pub id: String,
    /// Geometry on the board grid
    pub geometry: WidgetGeometry,
    /// Widget-type-specific configuration
    pub config: WidgetConfig,
}

impl WidgetRecord {
    pub fn new(id: impl Into<String>, geometry: WidgetGeometry, config: WidgetConfig) -> Self {
        Self {
            id: id.into(),
            geometry,
            config,
        }
    }
}
