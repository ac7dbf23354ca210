//! Resumption adapter: finds the last valid record of a persisted track so a
//! new run can continue from it. Contract: last valid record, or none.

use log::{info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::Result;
use crate::types::MotionState;
use crate::wire::TrackRecord;

/// Scans every line and returns the last one that parses. Malformed lines are
/// skipped; a read failure discards everything and resumes nothing.
pub fn last_record<R: BufRead>(reader: R, default_altitude: f64) -> Option<TrackRecord> {
    let mut last = None;
    let mut skipped = 0usize;
    let mut skipped_since_last = 0usize;

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Track file unreadable ({}), starting a fresh track", e);
                return None;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match TrackRecord::parse(&line, default_altitude) {
            Ok(record) => {
                last = Some(record);
                skipped_since_last = 0;
            }
            Err(_) => {
                skipped += 1;
                skipped_since_last += 1;
            }
        }
    }

    if skipped_since_last > 0 && last.is_some() {
        warn!("Ignored {} malformed trailing record(s)", skipped_since_last);
    } else if skipped > 0 {
        warn!("Ignored {} malformed record(s)", skipped);
    }
    last
}

/// `last_record` over a file. Missing or empty files resume nothing.
pub fn last_record_in_file(path: &Path, default_altitude: f64) -> Option<TrackRecord> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("Cannot open {} ({}), starting a fresh track", path.display(), e);
            return None;
        }
    };

    let record = last_record(BufReader::new(file), default_altitude);
    if let Some(r) = &record {
        info!(
            "Resuming {} at T={:.1}s, lat={:.8}, lon={:.8}, alt={:.3}",
            path.display(),
            r.elapsed_time,
            r.latitude,
            r.longitude,
            r.altitude
        );
    }
    record
}

/// Motion state continuing from a persisted record
pub fn resume_state(record: &TrackRecord) -> Result<MotionState> {
    Ok(MotionState::resumed(
        record.position()?,
        record.elapsed_time,
        record.altitude,
    ))
}
