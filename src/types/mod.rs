//! Core value types shared by the synthesizer, encoders and adapters.

use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::{Result, TrackError};

/// Geographic position in degrees, longitude first.
///
/// Construction rejects non-finite values and latitudes outside [-90, 90], so
/// every `Coordinate` reaching the geodesy code is well-formed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Coordinate {
    lon: f64,
    lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Result<Self> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(TrackError::NonFinite(format!("({}, {})", lon, lat)));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(TrackError::InvalidCoordinate(format!(
                "latitude {} outside [-90, 90]",
                lat
            )));
        }
        Ok(Coordinate { lon, lat })
    }

    /// Internal constructor for values produced by closed-form math on
    /// already-validated coordinates. Latitude is clamped so rounding near
    /// the poles cannot leave [-90, 90].
    pub(crate) fn from_parts(lon: f64, lat: f64) -> Self {
        debug_assert!(lon.is_finite() && lat.is_finite());
        Coordinate {
            lon,
            lat: lat.clamp(-90.0, 90.0),
        }
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "({:.8}, {:.8})", self.lon, self.lat)
    }
}

/// Parses `"lon,lat"`, the order map vendors hand out when copying a point.
impl FromStr for Coordinate {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(',').map(str::trim);
        let (lon, lat) = match (parts.next(), parts.next(), parts.next()) {
            (Some(lon), Some(lat), None) => (lon, lat),
            _ => return Err(TrackError::InvalidCoordinate(s.to_string())),
        };
        let lon: f64 = lon
            .parse()
            .map_err(|_| TrackError::InvalidCoordinate(s.to_string()))?;
        let lat: f64 = lat
            .parse()
            .map_err(|_| TrackError::InvalidCoordinate(s.to_string()))?;
        Coordinate::new(lon, lat)
    }
}

/// One synthesized fix. Immutable once produced.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Sample {
    /// Seconds since the start of the track
    pub elapsed_time: f64,
    pub position: Coordinate,
    /// Meters
    pub altitude: f64,
    /// Instantaneous ground speed (m/s)
    pub speed: f64,
    /// Course over ground, degrees in [0, 360)
    pub heading: f64,
}

/// Inclusive [min, max] ground-speed range in m/s.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SpeedBand {
    min: f64,
    max: f64,
}

impl SpeedBand {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(TrackError::InvalidSpeedBand(format!("{}-{}", min, max)));
        }
        if min < 0.0 || min > max {
            return Err(TrackError::InvalidSpeedBand(format!(
                "need 0 <= min <= max, got {}-{}",
                min, max
            )));
        }
        Ok(SpeedBand { min, max })
    }

    /// Parses a custom band: `"10-15"` (either order) or a single speed `"15"`,
    /// which becomes a ±5 % band. A single `"0"` yields the zero band.
    pub fn parse(s: &str) -> Result<Self> {
        let values = s
            .split('-')
            .map(|p| p.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| TrackError::InvalidSpeedBand(s.to_string()))?;

        match values.as_slice() {
            [v] if *v == 0.0 => SpeedBand::new(0.0, 0.0),
            [v] => SpeedBand::new(v * 0.95, v * 1.05),
            [a, b] => SpeedBand::new(a.min(*b), a.max(*b)),
            _ => Err(TrackError::InvalidSpeedBand(s.to_string())),
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Lower clamp applied to the simulated speed
    pub fn lower_limit(&self) -> f64 {
        self.min * 0.8
    }

    /// Upper clamp applied to the simulated speed
    pub fn upper_limit(&self) -> f64 {
        self.max * 1.2
    }
}

impl Display for SpeedBand {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{:.2}-{:.2} m/s", self.min, self.max)
    }
}

/// Named motion presets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpeedMode {
    #[default]
    Walk,
    Jog,
    Run,
    Drive,
}

impl SpeedMode {
    pub fn band(&self) -> SpeedBand {
        let (min, max) = match self {
            SpeedMode::Walk => (1.2, 1.5),
            SpeedMode::Jog => (2.8, 3.5),
            SpeedMode::Run => (4.5, 5.5),
            SpeedMode::Drive => (12.0, 16.0),
        };
        SpeedBand { min, max }
    }
}

/// Accepts the numeric selectors `1`-`4` or the mode names.
impl FromStr for SpeedMode {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "walk" => Ok(SpeedMode::Walk),
            "2" | "jog" => Ok(SpeedMode::Jog),
            "3" | "run" => Ok(SpeedMode::Run),
            "4" | "drive" => Ok(SpeedMode::Drive),
            other => Err(TrackError::UnknownSpeedMode(other.to_string())),
        }
    }
}

/// Cross-leg motion state, passed into and returned from each leg synthesis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionState {
    pub position: Coordinate,
    pub elapsed_time: f64,
    pub altitude: f64,
    /// Unset until the first leg has run
    pub speed: Option<f64>,
}

impl MotionState {
    pub fn new(position: Coordinate, altitude: f64) -> Self {
        MotionState {
            position,
            elapsed_time: 0.0,
            altitude,
            speed: None,
        }
    }

    /// State continuing a persisted track at its last record
    pub fn resumed(position: Coordinate, elapsed_time: f64, altitude: f64) -> Self {
        MotionState {
            position,
            elapsed_time,
            altitude,
            speed: None,
        }
    }
}

/// One origin-to-destination motion request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Leg {
    pub start: Coordinate,
    pub end: Coordinate,
    pub band: SpeedBand,
}

impl Leg {
    pub fn new(start: Coordinate, end: Coordinate, band: SpeedBand) -> Self {
        Leg { start, end, band }
    }
}
