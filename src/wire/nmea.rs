//! NMEA 0183 GGA / RMC sentence rendering.

use chrono::{DateTime, Duration, Utc};

use crate::types::Sample;

/// m/s → knots
pub const KNOTS_PER_MS: f64 = 1.94384;

/// GGA placeholders: GPS fix, satellites in view, HDOP
const GGA_FIX_QUALITY: u8 = 1;
const GGA_SATELLITES: u8 = 12;
const GGA_HDOP: f64 = 0.8;

/// Maps a sample's elapsed time onto wall-clock UTC.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NmeaClock {
    epoch: DateTime<Utc>,
}

impl NmeaClock {
    /// Clock whose elapsed time 0 is `epoch`
    pub fn new(epoch: DateTime<Utc>) -> Self {
        NmeaClock { epoch }
    }

    /// Clock for a track resumed at `elapsed_s`, placing that instant at `now`
    /// so the sentence times continue without a jump.
    pub fn resumed(now: DateTime<Utc>, elapsed_s: f64) -> Self {
        NmeaClock {
            epoch: now - micros(elapsed_s),
        }
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    pub fn at(&self, elapsed_s: f64) -> DateTime<Utc> {
        self.epoch + micros(elapsed_s)
    }
}

fn micros(seconds: f64) -> Duration {
    Duration::microseconds((seconds * 1e6).round() as i64)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

/// XOR of every body byte, as two uppercase hex digits.
pub fn nmea_checksum(body: &str) -> String {
    let checksum = body.bytes().fold(0u8, |acc, b| acc ^ b);
    format!("{:02X}", checksum)
}

/// Wraps a body as `$<body>*<checksum>`
pub fn frame_sentence(body: &str) -> String {
    format!("${}*{}", body, nmea_checksum(body))
}

/// Decimal degrees → (`ddmm.mmmm` / `dddmm.mmmm`, hemisphere)
pub fn to_dmm(degrees: f64, axis: Axis) -> (String, char) {
    let negative = degrees < 0.0;
    let abs = degrees.abs();
    let mut whole = abs.trunc() as u32;
    let mut minutes = format!("{:07.4}", (abs - abs.trunc()) * 60.0);
    // 59.99996' prints as 60.0000; carry it into the degrees
    if minutes.starts_with("60") {
        whole += 1;
        minutes = "00.0000".to_string();
    }

    match axis {
        Axis::Latitude => (
            format!("{:02}{}", whole, minutes),
            if negative { 'S' } else { 'N' },
        ),
        Axis::Longitude => (
            format!("{:03}{}", whole, minutes),
            if negative { 'W' } else { 'E' },
        ),
    }
}

/// `hhmmss.ss`, centiseconds truncated
fn fix_time(t: &DateTime<Utc>) -> String {
    format!("{}.{:02}", t.format("%H%M%S"), t.timestamp_subsec_millis() / 10)
}

pub fn gga_sentence(sample: &Sample, clock: &NmeaClock) -> String {
    let t = clock.at(sample.elapsed_time);
    let (lat, lat_hem) = to_dmm(sample.position.lat(), Axis::Latitude);
    let (lon, lon_hem) = to_dmm(sample.position.lon(), Axis::Longitude);
    let body = format!(
        "GPGGA,{},{},{},{},{},{},{:02},{:.1},{:.1},M,,M,,",
        fix_time(&t),
        lat,
        lat_hem,
        lon,
        lon_hem,
        GGA_FIX_QUALITY,
        GGA_SATELLITES,
        GGA_HDOP,
        sample.altitude
    );
    frame_sentence(&body)
}

pub fn rmc_sentence(sample: &Sample, clock: &NmeaClock) -> String {
    let t = clock.at(sample.elapsed_time);
    let (lat, lat_hem) = to_dmm(sample.position.lat(), Axis::Latitude);
    let (lon, lon_hem) = to_dmm(sample.position.lon(), Axis::Longitude);
    let body = format!(
        "GPRMC,{},A,{},{},{},{},{:.2},{:.2},{},,",
        fix_time(&t),
        lat,
        lat_hem,
        lon,
        lon_hem,
        sample.speed * KNOTS_PER_MS,
        sample.heading,
        t.format("%d%m%y")
    );
    frame_sentence(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coordinate;
    use chrono::TimeZone;

    fn clock() -> NmeaClock {
        NmeaClock::new(Utc.with_ymd_and_hms(2024, 3, 5, 12, 34, 56).unwrap())
    }

    fn sample(t: f64, lon: f64, lat: f64, alt: f64, speed: f64, heading: f64) -> Sample {
        Sample {
            elapsed_time: t,
            position: Coordinate::new(lon, lat).unwrap(),
            altitude: alt,
            speed,
            heading,
        }
    }

    #[test]
    fn test_reference_checksum() {
        let body = "GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";
        assert_eq!(nmea_checksum(body), "47");
        assert_eq!(
            frame_sentence(body),
            "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47"
        );
    }

    #[test]
    fn test_checksum_is_two_uppercase_digits() {
        assert_eq!(nmea_checksum(""), "00");
        assert_eq!(nmea_checksum("\n"), "0A");
        assert_eq!(nmea_checksum("AB"), "03");
    }

    #[test]
    fn test_dmm_padding_and_hemispheres() {
        assert_eq!(to_dmm(39.90923, Axis::Latitude), ("3954.5538".to_string(), 'N'));
        assert_eq!(to_dmm(-5.5, Axis::Latitude), ("0530.0000".to_string(), 'S'));
        assert_eq!(to_dmm(116.397428, Axis::Longitude), ("11623.8457".to_string(), 'E'));
        assert_eq!(to_dmm(-8.25, Axis::Longitude), ("00815.0000".to_string(), 'W'));
        assert_eq!(to_dmm(0.0, Axis::Longitude), ("00000.0000".to_string(), 'E'));
    }

    #[test]
    fn test_dmm_minute_carry() {
        assert_eq!(to_dmm(10.999_999_9, Axis::Latitude), ("1100.0000".to_string(), 'N'));
    }

    #[test]
    fn test_gga_sentence() {
        let s = sample(0.789, -116.397428, 39.90923, 100.0, 1.3, 0.0);
        assert_eq!(
            gga_sentence(&s, &clock()),
            "$GPGGA,123456.78,3954.5538,N,11623.8457,W,1,12,0.8,100.0,M,,M,,*6B"
        );
    }

    #[test]
    fn test_rmc_sentence() {
        let s = sample(0.789, 116.397428, -39.90923, 100.0, 1.35, 45.5);
        assert_eq!(
            rmc_sentence(&s, &clock()),
            "$GPRMC,123456.78,A,3954.5538,S,11623.8457,E,2.62,45.50,050324,,*1D"
        );
    }

    #[test]
    fn test_sentence_checksums_verify() {
        let s = sample(3600.5, 2.2945, 48.8584, 35.2, 12.0, 270.0);
        for sentence in [gga_sentence(&s, &clock()), rmc_sentence(&s, &clock())] {
            let (body, cs) = sentence[1..].split_once('*').unwrap();
            assert_eq!(nmea_checksum(body), cs);
            assert!(sentence.starts_with('$'));
        }
    }

    #[test]
    fn test_clock_rolls_over_midnight() {
        let clock = NmeaClock::new(Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap());
        let s = sample(1.5, 0.0, 0.0, 0.0, 0.0, 0.0);
        let rmc = rmc_sentence(&s, &clock);
        assert!(rmc.starts_with("$GPRMC,000000.50,A,"));
        assert!(rmc.contains(",010125,,*"));
    }

    #[test]
    fn test_resumed_clock_places_elapsed_at_now() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let clock = NmeaClock::resumed(now, 125.0);
        assert_eq!(clock.at(125.0), now);
        assert_eq!(clock.epoch(), Utc.with_ymd_and_hms(2024, 6, 1, 7, 57, 55).unwrap());
    }
}
