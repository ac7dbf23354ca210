//! Persisted tabular track format: `elapsed_time,latitude,longitude,altitude`
//! per line, no header. The fixed precision (1 / 8 / 8 / 3 decimals) is what
//! resumption parsing relies on.

use serde::Serialize;
use std::fmt::{Display, Formatter};

use crate::error::{Result, TrackError};
use crate::types::{Coordinate, Sample};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrackRecord {
    pub elapsed_time: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl TrackRecord {
    pub fn from_sample(sample: &Sample) -> Self {
        TrackRecord {
            elapsed_time: sample.elapsed_time,
            latitude: sample.position.lat(),
            longitude: sample.position.lon(),
            altitude: sample.altitude,
        }
    }

    /// Parses one line. Three fields are accepted, in which case the
    /// altitude falls back to `default_altitude`.
    pub fn parse(line: &str, default_altitude: f64) -> Result<Self> {
        let malformed = || TrackError::MalformedRecord(line.to_string());

        let fields: Vec<&str> = line.trim().split(',').map(str::trim).collect();
        if fields.len() < 3 || fields.len() > 4 {
            return Err(malformed());
        }

        let number = |s: &str| -> Result<f64> {
            s.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| malformed())
        };

        let elapsed_time = number(fields[0])?;
        if elapsed_time < 0.0 {
            return Err(malformed());
        }
        let latitude = number(fields[1])?;
        let longitude = number(fields[2])?;
        let altitude = match fields.get(3) {
            Some(s) if !s.is_empty() => number(s)?,
            _ => default_altitude,
        };

        // Reject records that could not have been a real position
        Coordinate::new(longitude, latitude).map_err(|_| malformed())?;

        Ok(TrackRecord {
            elapsed_time,
            latitude,
            longitude,
            altitude,
        })
    }

    pub fn position(&self) -> Result<Coordinate> {
        Coordinate::new(self.longitude, self.latitude)
    }
}

impl Display for TrackRecord {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{:.1},{:.8},{:.8},{:.3}",
            self.elapsed_time, self.latitude, self.longitude, self.altitude
        )
    }
}
