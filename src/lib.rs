//! Synthetic GPS ground-track generation.
//!
//! Waypoint legs are walked at a fixed cadence with an auto-correlated speed
//! model, and the resulting samples are rendered as tabular records, NMEA
//! GGA/RMC sentences and KML.

pub mod config;
pub mod error;
pub mod frames;
pub mod geodesy;
pub mod motion;
pub mod resume;
pub mod sink;
pub mod stats;
pub mod synth;
pub mod types;
pub mod waypoints;
pub mod wire;

pub use config::{AltitudeConfig, SynthConfig};
pub use error::{Result, TrackError};
pub use frames::Frame;
pub use synth::{LegSynthesis, Phase, Synthesizer};
pub use types::{Coordinate, Leg, MotionState, Sample, SpeedBand, SpeedMode};
