//! Simulated status provider for demos and tests
//!
//! Provides a configurable value source with manual control or automatic
//! oscillation, so the full registry → adapter → display pipeline can run
//! without a backend.

use crate::providers::{ProviderError, StatusProvider};
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use rt_board_types::{Aggregate, DataPoint, EntityId, EntityStatus, TimeRange};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;

/// Simulated value generation mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimMode {
    /// Manual static value
    #[default]
    Manual,
    /// Sine wave oscillation
    SineWave,
    /// Sawtooth wave (linear ramp)
    Sawtooth,
    /// Square wave
    Square,
}

/// Configuration for the simulated provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimProviderConfig {
    pub mode: SimMode,
    /// Value used in Manual mode
    pub manual_value: f64,
    pub min_value: f64,
    pub max_value: f64,
    /// Wave period in seconds (for oscillation modes)
    pub period: f64,
    /// Uniform noise amplitude added to every sample
    pub jitter: f64,
}

impl Default for SimProviderConfig {
    fn default() -> Self {
        Self {
            mode: SimMode::Manual,
            manual_value: 50.0,
            min_value: 0.0,
            max_value: 100.0,
            period: 5.0,
            jitter: 0.0,
        }
    }
}

/// Simulated status provider
pub struct SimProvider {
    config: SimProviderConfig,
    start_time: Instant,
}

impl SimProvider {
    pub fn new(config: SimProviderConfig) -> Self {
        Self {
            config,
            start_time: Instant::now(),
        }
    }

    /// Calculate the current value based on mode and elapsed time
    fn sample(&self) -> f64 {
        let config = &self.config;
        let range = config.max_value - config.min_value;

        let base = match config.mode {
            SimMode::Manual => config.manual_value,
            SimMode::SineWave => {
                let elapsed = self.start_time.elapsed().as_secs_f64();
                let phase = (elapsed / config.period) * std::f64::consts::TAU;
                let normalized = (phase.sin() + 1.0) / 2.0; // 0.0 to 1.0
                config.min_value + normalized * range
            }
            SimMode::Sawtooth => {
                let elapsed = self.start_time.elapsed().as_secs_f64();
                let normalized = (elapsed / config.period).fract(); // 0.0 to 1.0
                config.min_value + normalized * range
            }
            SimMode::Square => {
                let elapsed = self.start_time.elapsed().as_secs_f64();
                let phase = (elapsed / config.period).fract();
                if phase < 0.5 {
                    config.min_value
                } else {
                    config.max_value
                }
            }
        };

        if config.jitter > 0.0 {
            base + rand::thread_rng().gen_range(-config.jitter..=config.jitter)
        } else {
            base
        }
    }
}

impl Default for SimProvider {
    fn default() -> Self {
        Self::new(SimProviderConfig::default())
    }
}

#[async_trait]
impl StatusProvider for SimProvider {
    async fn entity_status(&self, _id: &EntityId) -> Result<EntityStatus, ProviderError> {
        Ok(EntityStatus::new(json!(self.sample())).with_timestamp(Utc::now()))
    }

    async fn aggregate_history(
        &self,
        _id: &EntityId,
        range: &TimeRange,
        _aggregate: Aggregate,
    ) -> Result<Vec<DataPoint>, ProviderError> {
        const POINTS: usize = 20;

        let (start, end) = range.bounds(Utc::now());
        let step = (end - start) / POINTS as i32;
        let config = &self.config;
        let span = config.max_value - config.min_value;

        // Sample the configured waveform across the requested window
        let points = (0..POINTS)
            .map(|i| {
                let timestamp = start + step * i as i32;
                let t = i as f64 / POINTS as f64;
                let value = match config.mode {
                    SimMode::Manual => config.manual_value,
                    SimMode::SineWave => {
                        let normalized = ((t * std::f64::consts::TAU).sin() + 1.0) / 2.0;
                        config.min_value + normalized * span
                    }
                    SimMode::Sawtooth => config.min_value + t * span,
                    SimMode::Square => {
                        if t < 0.5 {
                            config.min_value
                        } else {
                            config.max_value
                        }
                    }
                };
                DataPoint { timestamp, value }
            })
            .collect();
        Ok(points)
    }
}
