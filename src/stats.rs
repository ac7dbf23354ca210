use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::{Result, TrackError};
use crate::geodesy::distance;
use crate::types::{Coordinate, Sample};

/// Run summary, accumulated sample by sample
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrackStats {
    pub samples: usize,
    pub legs: usize,
    pub distance_m: f64,
    pub start_time_s: f64,
    pub end_time_s: f64,
    pub peak_speed_ms: f64,
    #[serde(skip)]
    last_position: Option<Coordinate>,
}

impl TrackStats {
    /// Stats for a run starting at `position` and `elapsed_time`
    pub fn starting_at(position: Coordinate, elapsed_time: f64) -> Self {
        Self {
            start_time_s: elapsed_time,
            end_time_s: elapsed_time,
            last_position: Some(position),
            ..Default::default()
        }
    }

    pub fn record(&mut self, sample: &Sample) {
        if let Some(prev) = self.last_position {
            self.distance_m += distance(prev, sample.position);
        }
        self.last_position = Some(sample.position);
        self.samples += 1;
        self.end_time_s = sample.elapsed_time;
        self.peak_speed_ms = self.peak_speed_ms.max(sample.speed);
    }

    pub fn duration_s(&self) -> f64 {
        self.end_time_s - self.start_time_s
    }

    pub fn average_speed_ms(&self) -> f64 {
        let duration = self.duration_s();
        if duration > 0.0 {
            self.distance_m / duration
        } else {
            0.0
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| TrackError::WriteFailed(e.to_string()))?;
        fs::write(path, json).map_err(|e| TrackError::WriteFailed(format!("{}: {}", path.display(), e)))
    }
}
