//! De-obfuscation of the regional map datums into WGS-84.
//!
//! GCJ-02 is the nationally mandated offset of WGS-84; BD-09 is a vendor
//! offset layered on top of GCJ-02. Both are empirical fits, so the series
//! and constants below must stay bit-for-bit as they are: consumers compare
//! against the vendors' own inverse at the meter level.
//!
//! Only the inverse direction (towards WGS-84) is provided.

use std::f64::consts::PI;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::TrackError;
use crate::types::Coordinate;

/// Krasovsky 1940 semi-major axis (m)
const KRASOVSKY_A: f64 = 6378245.0;
/// Krasovsky 1940 first eccentricity squared
const KRASOVSKY_EE: f64 = 0.00669342162296594323;

/// Offset origin of the GCJ-02 series (lon, lat)
const GCJ_ORIGIN_LON: f64 = 105.0;
const GCJ_ORIGIN_LAT: f64 = 35.0;

const BD_OFFSET_LON: f64 = 0.0065;
const BD_OFFSET_LAT: f64 = 0.006;
const BD_X_PI: f64 = PI * 3000.0 / 180.0;

/// Geographic reference frame of an input coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Frame {
    /// Global frame, no offset
    Wgs84,
    /// Regional obfuscated frame
    #[default]
    Gcj02,
    /// Vendor obfuscated frame
    Bd09,
}

impl Frame {
    /// Converts a coordinate expressed in this frame into WGS-84.
    pub fn to_global(&self, point: Coordinate) -> Coordinate {
        match self {
            Frame::Wgs84 => point,
            Frame::Gcj02 => gcj02_to_wgs84(point),
            Frame::Bd09 => bd09_to_wgs84(point),
        }
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let name = match self {
            Frame::Wgs84 => "WGS-84",
            Frame::Gcj02 => "GCJ-02",
            Frame::Bd09 => "BD-09",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Frame {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "wgs84" | "wgs" => Ok(Frame::Wgs84),
            "gcj02" | "gcj" | "gaode" | "amap" => Ok(Frame::Gcj02),
            "bd09" | "bd" | "baidu" => Ok(Frame::Bd09),
            _ => Err(TrackError::UnknownFrame(s.to_string())),
        }
    }
}

/// True when the point lies outside the national box the GCJ-02 offset
/// applies to.
pub fn out_of_region(point: Coordinate) -> bool {
    let (lon, lat) = (point.lon(), point.lat());
    !((72.004..=137.8347).contains(&lon) && (0.8293..=55.8271).contains(&lat))
}

fn gcj_lat_series(x: f64, y: f64) -> f64 {
    let mut ret = -100.0 + 2.0 * x + 3.0 * y + 0.2 * y * y + 0.1 * x * y + 0.2 * x.abs().sqrt();
    ret += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (y * PI).sin() + 40.0 * (y / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (160.0 * (y / 12.0 * PI).sin() + 320.0 * (y * PI / 30.0).sin()) * 2.0 / 3.0;
    ret
}

fn gcj_lon_series(x: f64, y: f64) -> f64 {
    let mut ret = 300.0 + x + 2.0 * y + 0.1 * x * x + 0.1 * x * y + 0.1 * x.abs().sqrt();
    ret += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (x * PI).sin() + 40.0 * (x / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (150.0 * (x / 12.0 * PI).sin() + 300.0 * (x / 30.0 * PI).sin()) * 2.0 / 3.0;
    ret
}

/// GCJ-02 offset (d_lon, d_lat) in degrees at `point`.
fn gcj_delta(point: Coordinate) -> (f64, f64) {
    let (lon, lat) = (point.lon(), point.lat());
    let d_lat = gcj_lat_series(lon - GCJ_ORIGIN_LON, lat - GCJ_ORIGIN_LAT);
    let d_lon = gcj_lon_series(lon - GCJ_ORIGIN_LON, lat - GCJ_ORIGIN_LAT);

    let rad_lat = lat / 180.0 * PI;
    let magic = 1.0 - KRASOVSKY_EE * rad_lat.sin() * rad_lat.sin();
    let sqrt_magic = magic.sqrt();

    let d_lat = (d_lat * 180.0) / ((KRASOVSKY_A * (1.0 - KRASOVSKY_EE)) / (magic * sqrt_magic) * PI);
    let d_lon = (d_lon * 180.0) / (KRASOVSKY_A / sqrt_magic * rad_lat.cos() * PI);
    (d_lon, d_lat)
}

/// GCJ-02 → WGS-84. Points outside the region come back untouched.
pub fn gcj02_to_wgs84(point: Coordinate) -> Coordinate {
    if out_of_region(point) {
        return point;
    }
    let (d_lon, d_lat) = gcj_delta(point);
    Coordinate::from_parts(point.lon() - d_lon, point.lat() - d_lat)
}

/// BD-09 → GCJ-02.
pub fn bd09_to_gcj02(point: Coordinate) -> Coordinate {
    let x = point.lon() - BD_OFFSET_LON;
    let y = point.lat() - BD_OFFSET_LAT;
    let z = (x * x + y * y).sqrt() - 0.00002 * (y * BD_X_PI).sin();
    let theta = y.atan2(x) - 0.000003 * (x * BD_X_PI).cos();
    Coordinate::from_parts(z * theta.cos(), z * theta.sin())
}

/// BD-09 → WGS-84, through GCJ-02.
pub fn bd09_to_wgs84(point: Coordinate) -> Coordinate {
    gcj02_to_wgs84(bd09_to_gcj02(point))
}
