//! Configuration management

mod settings;

pub use settings::{AppConfig, DashboardConfig, GridConfig, TuningConfig};
