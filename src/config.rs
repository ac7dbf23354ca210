use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, TrackError};
use crate::motion::{DEFAULT_SMOOTHING_GAIN, DEFAULT_SPEED_FLOOR};

/// Altitude envelope and per-step jitter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AltitudeConfig {
    /// Starting altitude for fresh tracks (m)
    pub default_m: f64,
    pub min_m: f64,
    pub max_m: f64,
    /// Half-width of the uniform jitter draw
    pub fluctuation: f64,
    /// Multiplier applied to the jitter draw
    pub fluctuation_scale: f64,
}

impl Default for AltitudeConfig {
    fn default() -> Self {
        Self {
            default_m: 100.0,
            min_m: 1.0,
            max_m: 150.0,
            fluctuation: 0.003,
            fluctuation_scale: 10.0,
        }
    }
}

impl AltitudeConfig {
    /// Largest altitude change a single step can make (m)
    pub fn max_step(&self) -> f64 {
        self.fluctuation * self.fluctuation_scale
    }

    pub fn clamp(&self, altitude: f64) -> f64 {
        altitude.clamp(self.min_m, self.max_m)
    }
}

/// Synthesis parameters. Every field has a default so a config file only
/// needs the values it overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Simulated seconds between consecutive samples
    pub cadence_s: f64,
    pub smoothing_gain: f64,
    pub speed_floor_ms: f64,
    pub altitude: AltitudeConfig,
    /// Fixed seed for reproducible tracks
    pub seed: Option<u64>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            cadence_s: 1.0,
            smoothing_gain: DEFAULT_SMOOTHING_GAIN,
            speed_floor_ms: DEFAULT_SPEED_FLOOR,
            altitude: AltitudeConfig::default(),
            seed: None,
        }
    }
}

impl SynthConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| TrackError::ReadFailed(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: SynthConfig = serde_json::from_str(text)
            .map_err(|e| TrackError::InvalidConfig(format!("Failed to parse config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies command-line overrides and re-validates the result.
    pub fn with_overrides(mut self, cadence_s: Option<f64>, seed: Option<u64>) -> Result<Self> {
        if let Some(cadence_s) = cadence_s {
            self.cadence_s = cadence_s;
        }
        if seed.is_some() {
            self.seed = seed;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.cadence_s.is_finite() || self.cadence_s <= 0.0 {
            return Err(TrackError::InvalidConfig(format!(
                "cadence_s must be positive, got {}",
                self.cadence_s
            )));
        }
        if !(self.smoothing_gain > 0.0 && self.smoothing_gain <= 1.0) {
            return Err(TrackError::InvalidConfig(format!(
                "smoothing_gain must be in (0, 1], got {}",
                self.smoothing_gain
            )));
        }
        if !self.speed_floor_ms.is_finite() || self.speed_floor_ms <= 0.0 {
            return Err(TrackError::InvalidConfig(format!(
                "speed_floor_ms must be positive, got {}",
                self.speed_floor_ms
            )));
        }

        let alt = &self.altitude;
        let values = [alt.default_m, alt.min_m, alt.max_m, alt.fluctuation, alt.fluctuation_scale];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(TrackError::InvalidConfig("altitude values must be finite".to_string()));
        }
        if alt.min_m > alt.max_m {
            return Err(TrackError::InvalidConfig(format!(
                "altitude envelope inverted: {} > {}",
                alt.min_m, alt.max_m
            )));
        }
        if !(alt.min_m..=alt.max_m).contains(&alt.default_m) {
            return Err(TrackError::InvalidConfig(format!(
                "default altitude {} outside envelope [{}, {}]",
                alt.default_m, alt.min_m, alt.max_m
            )));
        }
        if alt.fluctuation < 0.0 || alt.fluctuation_scale < 0.0 {
            return Err(TrackError::InvalidConfig(
                "altitude fluctuation must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
