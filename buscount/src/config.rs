//! Counter configuration, stored as JSON

use crate::error::{CounterError, Result};
use linetrack::affinities::{ColorHistogramExtractor, FeatureAffinity, PositionAffinity};
use linetrack::{AssociationEngine, EngineConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// How the pipeline stages are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStyle {
    /// One frame at a time on the caller thread
    Serial,
    /// Stages on their own threads with bounded overlap
    Parallel,
}

/// Configuration for a [`BusCounter`](crate::BusCounter)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Association tuning
    pub engine: EngineConfig,
    pub run_style: RunStyle,
    /// Frames allowed between leaving the source and reaching the sink
    pub max_in_flight: usize,
    /// How long the caller waits on the display queue between exit checks
    pub poll_interval_ms: u64,
    /// Annotate frames before handing them to the sink
    pub draw: bool,
    /// Acceptance radius of the position modality, relative to box area
    pub position_scale: f32,
    /// Weight of the position modality, zero disables it
    pub position_weight: f32,
    /// Weight of the colour histogram modality, zero disables it
    pub feature_weight: f32,
    /// Frames between statistics log lines
    pub stats_interval: u64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            run_style: RunStyle::Parallel,
            max_in_flight: 2,
            poll_interval_ms: 20,
            draw: true,
            position_scale: 0.7,
            position_weight: 1.0,
            feature_weight: 1.0,
            stats_interval: 100,
        }
    }
}

impl CounterConfig {
    /// Load from a JSON file, missing fields take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: CounterConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight == 0 {
            return Err(CounterError::config("max_in_flight must be at least 1"));
        }
        if self.position_weight <= 0.0 && self.feature_weight <= 0.0 {
            return Err(CounterError::config("at least one modality needs a positive weight"));
        }
        if self.engine.decay_rate <= 0.0 {
            return Err(CounterError::config("decay_rate must be positive"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Build the association engine described by this config
    pub fn build_engine(&self) -> AssociationEngine {
        let mut engine = AssociationEngine::new(self.engine);
        if self.position_weight > 0.0 {
            engine = engine.with_affinity(
                self.position_weight,
                PositionAffinity::new(self.position_scale),
            );
        }
        if self.feature_weight > 0.0 {
            engine = engine.with_affinity(
                self.feature_weight,
                FeatureAffinity::new(ColorHistogramExtractor::default()),
            );
        }
        engine
    }
}
