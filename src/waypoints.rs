//! Waypoint CSV loading and leg planning.
//!
//! The file carries a header row naming its columns. Longitude and latitude are
//! required, a speed-mode column is optional. Map-vendor exports use the
//! Chinese headers `经度` / `纬度` / `速度`, which are accepted alongside the
//! English names. Points are converted into WGS-84 on load.

use log::{debug, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Result, TrackError};
use crate::frames::Frame;
use crate::types::{Coordinate, Leg, SpeedBand, SpeedMode};

const LON_HEADERS: &[&str] = &["lon", "lng", "longitude", "经度"];
const LAT_HEADERS: &[&str] = &["lat", "latitude", "纬度"];
const MODE_HEADERS: &[&str] = &["mode", "speed", "速度"];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Waypoint {
    /// WGS-84 position
    pub position: Coordinate,
    /// Speed mode for the leg ending here, if the row named one
    pub mode: Option<SpeedMode>,
}

struct Columns {
    lon: usize,
    lat: usize,
    mode: Option<usize>,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self> {
        let names: Vec<String> = header
            .trim_start_matches('\u{feff}')
            .split(',')
            .map(|h| h.trim().to_lowercase())
            .collect();
        let find = |candidates: &[&str]| names.iter().position(|n| candidates.contains(&n.as_str()));

        let lon = find(LON_HEADERS)
            .ok_or_else(|| TrackError::ReadFailed(format!("no longitude column in header {:?}", header)))?;
        let lat = find(LAT_HEADERS)
            .ok_or_else(|| TrackError::ReadFailed(format!("no latitude column in header {:?}", header)))?;

        Ok(Columns {
            lon,
            lat,
            mode: find(MODE_HEADERS),
        })
    }
}

/// Reads waypoints in `frame` and returns them in WGS-84.
///
/// Blank rows are skipped. A row whose coordinates do not parse fails the whole
/// load; an unknown mode value only drops the mode for that row.
pub fn parse_waypoints<R: BufRead>(reader: R, frame: Frame) -> Result<Vec<Waypoint>> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line.map_err(|e| TrackError::ReadFailed(e.to_string()))?,
        None => return Ok(Vec::new()),
    };
    let columns = Columns::from_header(&header)?;

    let mut waypoints = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line.map_err(|e| TrackError::ReadFailed(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let row_no = i + 2;
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();

        let number = |idx: usize| -> Result<f64> {
            fields
                .get(idx)
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| TrackError::InvalidCoordinate(format!("row {}: {:?}", row_no, line)))
        };
        let source = Coordinate::new(number(columns.lon)?, number(columns.lat)?)?;

        let mode = match columns.mode.and_then(|idx| fields.get(idx)) {
            Some(s) if !s.is_empty() => match s.parse::<SpeedMode>() {
                Ok(mode) => Some(mode),
                Err(_) => {
                    warn!("Row {}: unknown speed mode {:?}, inheriting the previous one", row_no, s);
                    None
                }
            },
            _ => None,
        };

        waypoints.push(Waypoint {
            position: frame.to_global(source),
            mode,
        });
    }

    debug!("Loaded {} waypoints ({} frame)", waypoints.len(), frame);
    Ok(waypoints)
}

pub fn load_waypoints(path: &Path, frame: Frame) -> Result<Vec<Waypoint>> {
    let file = File::open(path)
        .map_err(|e| TrackError::ReadFailed(format!("{}: {}", path.display(), e)))?;
    parse_waypoints(BufReader::new(file), frame)
}

/// Turns consecutive waypoints into legs.
///
/// `override_band` applies to every leg when given. Otherwise each leg uses the
/// mode of its end waypoint, or the last mode seen (starting from
/// `default_mode`). `resume_from` is prepended as the first leg's start.
pub fn plan_legs(
    waypoints: &[Waypoint],
    override_band: Option<SpeedBand>,
    default_mode: SpeedMode,
    resume_from: Option<Coordinate>,
) -> Vec<Leg> {
    let mut points: Vec<Waypoint> = Vec::with_capacity(waypoints.len() + 1);
    if let Some(position) = resume_from {
        points.push(Waypoint { position, mode: None });
    }
    points.extend_from_slice(waypoints);

    let mut last_mode = default_mode;
    points
        .windows(2)
        .map(|pair| {
            let band = match override_band {
                Some(band) => band,
                None => {
                    if let Some(mode) = pair[1].mode {
                        last_mode = mode;
                    }
                    last_mode.band()
                }
            };
            Leg::new(pair[0].position, pair[1].position, band)
        })
        .collect()
}
