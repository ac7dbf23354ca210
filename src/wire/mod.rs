//! Renderers turning samples into downstream formats.

pub mod kml;
pub mod nmea;
pub mod record;

pub use nmea::{gga_sentence, nmea_checksum, rmc_sentence, NmeaClock};
pub use record::TrackRecord;
