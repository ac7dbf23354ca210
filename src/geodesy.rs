//! Spherical-earth geodesy: haversine distance, initial bearing and the
//! direct problem (destination from origin, bearing and distance).

use crate::error::{Result, TrackError};
use crate::types::Coordinate;

/// Mean earth radius used by every geodesy routine (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Points closer than this on both axes are treated as coincident (degrees)
const COINCIDENT_EPS_DEG: f64 = 1e-9;

/// Great-circle distance in meters between two points.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    if coincident(a, b) {
        return 0.0;
    }

    let lat1 = a.lat().to_radians();
    let lat2 = b.lat().to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (b.lon() - a.lon()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial bearing from `a` towards `b`, degrees in [0, 360).
///
/// Returns 0 when the points coincide.
pub fn bearing(a: Coordinate, b: Coordinate) -> f64 {
    if coincident(a, b) {
        return 0.0;
    }

    let lat1 = a.lat().to_radians();
    let lat2 = b.lat().to_radians();
    let d_lon = (b.lon() - a.lon()).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Point reached by travelling `distance_m` from `origin` along the great
/// circle leaving it at `bearing_deg`.
///
/// Bearing and distance must be finite; anything else is rejected instead of
/// producing a NaN position.
pub fn destination(origin: Coordinate, bearing_deg: f64, distance_m: f64) -> Result<Coordinate> {
    if !bearing_deg.is_finite() || !distance_m.is_finite() {
        return Err(TrackError::NonFinite(format!(
            "bearing {} / distance {}",
            bearing_deg, distance_m
        )));
    }

    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let lat1 = origin.lat().to_radians();
    let lon1 = origin.lon().to_radians();

    let sin_lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).clamp(-1.0, 1.0);
    let lat2 = sin_lat2.asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    Ok(Coordinate::from_parts(
        wrap_longitude(lon2.to_degrees()),
        lat2.to_degrees(),
    ))
}

fn coincident(a: Coordinate, b: Coordinate) -> bool {
    (a.lat() - b.lat()).abs() < COINCIDENT_EPS_DEG && (a.lon() - b.lon()).abs() < COINCIDENT_EPS_DEG
}

/// Maps any finite angle into [0, 360)
pub(crate) fn normalize_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}
