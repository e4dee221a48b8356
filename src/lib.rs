//! rt-board: Real-time entity data layer for IoT dashboards
//!
//! This library provides the core functionality for rt-board, including:
//! - The entity listener registry fanning transport change batches out to widgets
//! - Debounced status fetch adapters with stale-result cancellation
//! - Pure display derivation (alarm emphasis, axis ranges, grid presets)
//! - Drawing board sessions binding dashboards to the realtime transport

pub mod config;
pub mod core;
pub mod display;
pub mod providers;

// Re-export commonly used types
pub use config::AppConfig;
pub use core::{DrawingBoardSession, EntityListenerRegistry, StatusFetchAdapter};
pub use rt_board_types as types;
