//! Track output files.
//!
//! `<base>.csv` holds tabular records, `<base>_gpgga.txt` / `<base>_gprmc.txt`
//! one NMEA sentence per line and `<base>.kml` the whole run as a line string.
//! Streams are opened in append mode so resumed runs extend the same files.

use log::{debug, info};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, TrackError};
use crate::types::Sample;
use crate::wire::kml::KmlTrack;
use crate::wire::{gga_sentence, rmc_sentence, NmeaClock, TrackRecord};

/// Which outputs a run produces
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputOptions {
    pub records: bool,
    pub gga: bool,
    pub rmc: bool,
    pub kml: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            records: true,
            gga: false,
            rmc: false,
            kml: false,
        }
    }
}

/// File names derived from an output base name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPaths {
    pub records: PathBuf,
    pub gga: PathBuf,
    pub rmc: PathBuf,
    pub kml: PathBuf,
    pub summary: PathBuf,
}

impl OutputPaths {
    pub fn new(base: &str) -> Self {
        Self {
            records: PathBuf::from(format!("{}.csv", base)),
            gga: PathBuf::from(format!("{}_gpgga.txt", base)),
            rmc: PathBuf::from(format!("{}_gprmc.txt", base)),
            kml: PathBuf::from(format!("{}.kml", base)),
            summary: PathBuf::from(format!("{}_summary.json", base)),
        }
    }

    /// Truncates the enabled outputs that already exist.
    pub fn clear(&self, options: &OutputOptions) -> Result<()> {
        let targets = [
            (options.records, &self.records),
            (options.gga, &self.gga),
            (options.rmc, &self.rmc),
            (options.kml, &self.kml),
        ];
        for (_, path) in targets.iter().filter(|(enabled, p)| *enabled && p.exists()) {
            File::create(path).map_err(|e| write_failed(path, e))?;
            info!("Cleared {}", path.display());
        }
        Ok(())
    }
}

fn write_failed(path: &Path, e: std::io::Error) -> TrackError {
    TrackError::WriteFailed(format!("{}: {}", path.display(), e))
}

fn open_append(path: &Path) -> Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| write_failed(path, e))?;
    Ok(BufWriter::new(file))
}

/// Writes samples to the record and NMEA streams as they are produced.
pub struct TrackWriter<W: Write = BufWriter<File>> {
    records: Option<W>,
    gga: Option<W>,
    rmc: Option<W>,
    kml: Option<(PathBuf, KmlTrack)>,
    clock: NmeaClock,
    written: usize,
}

impl TrackWriter<BufWriter<File>> {
    pub fn open(paths: &OutputPaths, options: &OutputOptions, clock: NmeaClock) -> Result<Self> {
        let open = |enabled: bool, path: &Path| -> Result<Option<BufWriter<File>>> {
            if enabled {
                debug!("Appending to {}", path.display());
                open_append(path).map(Some)
            } else {
                Ok(None)
            }
        };

        let mut writer = TrackWriter::from_writers(
            open(options.records, &paths.records)?,
            open(options.gga, &paths.gga)?,
            open(options.rmc, &paths.rmc)?,
            clock,
        );
        if options.kml {
            let name = paths
                .kml
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "track".to_string());
            writer.kml = Some((paths.kml.clone(), KmlTrack::new(&name)));
        }
        Ok(writer)
    }
}

impl<W: Write> TrackWriter<W> {
    pub fn from_writers(records: Option<W>, gga: Option<W>, rmc: Option<W>, clock: NmeaClock) -> Self {
        Self {
            records,
            gga,
            rmc,
            kml: None,
            clock,
            written: 0,
        }
    }

    /// Records the starting fix of a fresh track. NMEA streams only carry
    /// moving samples.
    pub fn write_start(&mut self, sample: &Sample) -> Result<()> {
        if let Some(w) = self.records.as_mut() {
            writeln!(w, "{}", TrackRecord::from_sample(sample)).map_err(stream_failed("records"))?;
        }
        if let Some((_, track)) = self.kml.as_mut() {
            track.push(sample);
        }
        Ok(())
    }

    pub fn write(&mut self, sample: &Sample) -> Result<()> {
        if let Some(w) = self.records.as_mut() {
            writeln!(w, "{}", TrackRecord::from_sample(sample)).map_err(stream_failed("records"))?;
        }
        if let Some(w) = self.gga.as_mut() {
            writeln!(w, "{}", gga_sentence(sample, &self.clock)).map_err(stream_failed("GGA"))?;
        }
        if let Some(w) = self.rmc.as_mut() {
            writeln!(w, "{}", rmc_sentence(sample, &self.clock)).map_err(stream_failed("RMC"))?;
        }
        if let Some((_, track)) = self.kml.as_mut() {
            track.push(sample);
        }
        self.written += 1;
        Ok(())
    }

    /// Samples written through `write`
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        for (name, w) in [("records", &mut self.records), ("GGA", &mut self.gga), ("RMC", &mut self.rmc)] {
            if let Some(w) = w.as_mut() {
                w.flush().map_err(stream_failed(name))?;
            }
        }
        Ok(())
    }

    /// Flushes the streams, writes the KML document if enabled and hands the
    /// streams back.
    pub fn finish(mut self) -> Result<(Option<W>, Option<W>, Option<W>)> {
        self.flush()?;
        if let Some((path, track)) = self.kml.take() {
            fs::write(&path, track.to_kml_xml()).map_err(|e| write_failed(&path, e))?;
            info!("KML written to {} ({} points)", path.display(), track.points.len());
        }
        Ok((self.records, self.gga, self.rmc))
    }
}

fn stream_failed(name: &'static str) -> impl Fn(std::io::Error) -> TrackError {
    move |e| TrackError::WriteFailed(format!("{} stream: {}", name, e))
}
