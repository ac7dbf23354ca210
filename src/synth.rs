//! Segment synthesizer.
//!
//! Walks one leg at a fixed cadence: each tick re-aims at the destination,
//! advances `speed × cadence` along the great circle, jitters the altitude
//! and lets the motion profile drift. Once the destination is within one and
//! a half steps, a single prorated sample is snapped onto it exactly.
//!
//! State between legs travels in an explicit `MotionState` value, and the
//! random source is owned by the `Synthesizer`, never a process global.

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SynthConfig;
use crate::error::Result;
use crate::geodesy::{bearing, destination, distance};
use crate::motion::MotionProfile;
use crate::types::{Coordinate, Leg, MotionState, Sample};

/// Legs shorter than this produce no samples (m)
pub const DEGENERATE_LEG_M: f64 = 0.01;
/// A final snap sample is emitted whenever more than this is left (m)
pub const FINAL_SNAP_EPS_M: f64 = 1e-6;
/// Switch to finalizing once the end is within this many steps
const FINALIZE_HORIZON_STEPS: f64 = 1.5;
/// Start offsets above this are reported (m)
const START_MISMATCH_WARN_M: f64 = 1.0;

/// Per-leg state machine phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Stepping,
    Finalizing,
    Done,
}

pub struct Synthesizer<R: Rng> {
    config: SynthConfig,
    rng: R,
}

impl Synthesizer<StdRng> {
    /// Synthesizer seeded from `config.seed`, or from OS entropy when unset
    pub fn from_config(config: SynthConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(config, rng)
    }
}

impl<R: Rng> Synthesizer<R> {
    pub fn new(config: SynthConfig, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(Synthesizer { config, rng })
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Starts synthesizing `leg` from `state`. The returned iterator yields
    /// the leg's samples; `finish()` hands back the state for the next leg.
    pub fn leg(&mut self, leg: Leg, state: MotionState) -> LegSynthesis<'_, R> {
        LegSynthesis::new(&self.config, &mut self.rng, leg, state)
    }

    /// Runs one leg to completion, feeding every sample to `sink`.
    pub fn synthesize_leg<F>(&mut self, leg: Leg, state: MotionState, mut sink: F) -> Result<MotionState>
    where
        F: FnMut(&Sample) -> Result<()>,
    {
        let mut run = self.leg(leg, state);
        for sample in &mut run {
            sink(&sample?)?;
        }
        run.finish()
    }

    /// Runs legs strictly in order, threading the motion state through them.
    pub fn synthesize_track<F>(&mut self, legs: &[Leg], state: MotionState, mut sink: F) -> Result<MotionState>
    where
        F: FnMut(&Sample) -> Result<()>,
    {
        let mut state = state;
        for (index, leg) in legs.iter().enumerate() {
            debug!("Leg {}/{}: {} -> {}", index + 1, legs.len(), leg.start, leg.end);
            state = self.synthesize_leg(*leg, state, &mut sink)?;
        }
        Ok(state)
    }
}

/// Samples of one leg, produced lazily.
pub struct LegSynthesis<'a, R: Rng> {
    config: &'a SynthConfig,
    rng: &'a mut R,
    leg: Leg,
    state: MotionState,
    position: Coordinate,
    /// None for degenerate legs
    profile: Option<MotionProfile>,
    phase: Phase,
    emitted: usize,
}

impl<'a, R: Rng> LegSynthesis<'a, R> {
    fn new(config: &'a SynthConfig, rng: &'a mut R, leg: Leg, state: MotionState) -> Self {
        let length = distance(leg.start, leg.end);

        if length < DEGENERATE_LEG_M {
            debug!("Skipping degenerate leg at {} ({:.4} m)", leg.start, length);
            return LegSynthesis {
                config,
                rng,
                leg,
                state,
                position: leg.start,
                profile: None,
                phase: Phase::Done,
                emitted: 0,
            };
        }

        let offset = distance(state.position, leg.start);
        if offset > START_MISMATCH_WARN_M {
            warn!(
                "Leg starts {:.1} m away from the current position {}",
                offset, state.position
            );
        }

        let profile = MotionProfile::enter(
            &leg.band,
            state.speed,
            config.smoothing_gain,
            config.speed_floor_ms,
            &mut *rng,
        );
        debug!(
            "Leg of {:.1} m, band {}, entry speed {:.2} m/s",
            length,
            leg.band,
            profile.speed()
        );

        let mut state = state;
        state.altitude = config.altitude.clamp(state.altitude);

        LegSynthesis {
            config,
            rng,
            leg,
            state,
            position: leg.start,
            profile: Some(profile),
            phase: Phase::Stepping,
            emitted: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Motion state as of the last emitted sample
    pub fn state(&self) -> &MotionState {
        &self.state
    }

    /// Drains any remaining samples and returns the state for the next leg.
    pub fn finish(mut self) -> Result<MotionState> {
        for sample in &mut self {
            sample?;
        }
        Ok(self.state)
    }

    fn step(&mut self) -> Result<Option<Sample>> {
        loop {
            let speed = match &self.profile {
                Some(profile) => profile.speed(),
                None => {
                    self.phase = Phase::Done;
                    return Ok(None);
                }
            };
            let cadence = self.config.cadence_s;

            match self.phase {
                Phase::Stepping => {
                    let remaining = distance(self.position, self.leg.end);
                    if remaining <= FINALIZE_HORIZON_STEPS * speed * cadence {
                        self.phase = Phase::Finalizing;
                        continue;
                    }

                    let heading = bearing(self.position, self.leg.end);
                    self.position = destination(self.position, heading, speed * cadence)?;
                    self.state.position = self.position;
                    self.state.elapsed_time += cadence;
                    self.state.altitude = self.jittered_altitude();

                    let sample = Sample {
                        elapsed_time: self.state.elapsed_time,
                        position: self.position,
                        altitude: self.state.altitude,
                        speed,
                        heading,
                    };

                    if let Some(profile) = self.profile.as_mut() {
                        let next = profile.advance(&self.leg.band, &mut *self.rng);
                        self.state.speed = Some(next);
                    }
                    self.emitted += 1;
                    return Ok(Some(sample));
                }
                Phase::Finalizing => {
                    self.phase = Phase::Done;

                    let remaining = distance(self.position, self.leg.end);
                    let heading = bearing(self.position, self.leg.end);
                    self.position = self.leg.end;
                    self.state.position = self.leg.end;
                    self.state.speed = Some(speed);

                    if remaining <= FINAL_SNAP_EPS_M {
                        debug!("Leg done after {} samples", self.emitted);
                        return Ok(None);
                    }

                    self.state.elapsed_time += remaining / speed.max(self.config.speed_floor_ms);
                    self.emitted += 1;
                    debug!("Leg done after {} samples", self.emitted);

                    return Ok(Some(Sample {
                        elapsed_time: self.state.elapsed_time,
                        position: self.leg.end,
                        altitude: self.state.altitude,
                        speed,
                        heading,
                    }));
                }
                Phase::Done => return Ok(None),
            }
        }
    }

    fn jittered_altitude(&mut self) -> f64 {
        let alt = &self.config.altitude;
        let jitter = if alt.fluctuation > 0.0 {
            self.rng.gen_range(-alt.fluctuation..=alt.fluctuation) * alt.fluctuation_scale
        } else {
            0.0
        };
        alt.clamp(self.state.altitude + jitter)
    }
}

impl<R: Rng> Iterator for LegSynthesis<'_, R> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(sample) => sample.map(Ok),
            Err(e) => {
                self.phase = Phase::Done;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AltitudeConfig;
    use crate::error::TrackError;
    use crate::types::{SpeedBand, SpeedMode};
    use approx::assert_abs_diff_eq;

    fn c(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat).unwrap()
    }

    fn seeded(seed: u64) -> Synthesizer<StdRng> {
        Synthesizer::new(SynthConfig::default(), StdRng::seed_from_u64(seed)).unwrap()
    }

    fn collect_leg(synth: &mut Synthesizer<StdRng>, leg: Leg, state: MotionState) -> (Vec<Sample>, MotionState) {
        let mut samples = Vec::new();
        let state = synth
            .synthesize_leg(leg, state, |s| {
                samples.push(*s);
                Ok(())
            })
            .unwrap();
        (samples, state)
    }

    fn assert_strictly_increasing(samples: &[Sample], start: f64) {
        let mut last = start;
        for s in samples {
            assert!(s.elapsed_time > last, "time {} after {}", s.elapsed_time, last);
            last = s.elapsed_time;
        }
    }

    #[test]
    fn test_walk_north_one_millidegree() {
        let start = c(0.0, 0.0);
        let end = c(0.0, 0.001);
        let leg = Leg::new(start, end, SpeedBand::new(1.2, 1.5).unwrap());

        for seed in [1, 2024, 99] {
            let mut synth = seeded(seed);
            let (samples, state) = collect_leg(&mut synth, leg, MotionState::new(start, 100.0));

            assert!(
                (80..=90).contains(&samples.len()),
                "seed {} produced {} samples",
                seed,
                samples.len()
            );
            assert_strictly_increasing(&samples, 0.0);

            let last = samples.last().unwrap();
            assert_eq!(last.position, end);
            assert_abs_diff_eq!(last.position.lat(), 0.001, epsilon = 1e-12);
            assert_abs_diff_eq!(last.position.lon(), 0.0, epsilon = 1e-12);
            assert_eq!(state.position, end);
            assert_eq!(state.elapsed_time, last.elapsed_time);
        }
    }

    #[test]
    fn test_samples_head_towards_destination() {
        let start = c(0.0, 0.0);
        let end = c(0.0, 0.001);
        let leg = Leg::new(start, end, SpeedMode::Walk.band());
        let (samples, _) = collect_leg(&mut seeded(5), leg, MotionState::new(start, 100.0));

        let mut last_remaining = distance(start, end);
        for s in &samples {
            assert_abs_diff_eq!(s.heading, 0.0, epsilon = 1e-6);
            let remaining = distance(s.position, end);
            assert!(remaining < last_remaining);
            last_remaining = remaining;
        }
    }

    #[test]
    fn test_speed_stays_inside_clamp() {
        let band = SpeedMode::Drive.band();
        let start = c(116.30, 39.90);
        let end = c(116.35, 39.95);
        let leg = Leg::new(start, end, band);
        let (samples, _) = collect_leg(&mut seeded(3), leg, MotionState::new(start, 100.0));

        assert!(samples.len() > 100);
        for s in &samples {
            assert!(s.speed >= band.lower_limit() && s.speed <= band.upper_limit());
            assert!((0.0..360.0).contains(&s.heading));
        }
    }

    #[test]
    fn test_altitude_stays_in_envelope() {
        let config = SynthConfig {
            altitude: AltitudeConfig {
                default_m: 100.0,
                min_m: 99.95,
                max_m: 100.05,
                ..AltitudeConfig::default()
            },
            ..SynthConfig::default()
        };
        let mut synth = Synthesizer::new(config.clone(), StdRng::seed_from_u64(17)).unwrap();
        let start = c(10.0, 50.0);
        let end = c(10.02, 50.02);
        let leg = Leg::new(start, end, SpeedMode::Walk.band());
        let (samples, state) = collect_leg(&mut synth, leg, MotionState::new(start, 100.0));

        assert!(samples.len() > 1_000);
        for s in &samples {
            assert!(s.altitude >= config.altitude.min_m && s.altitude <= config.altitude.max_m);
        }
        assert!(state.altitude >= config.altitude.min_m && state.altitude <= config.altitude.max_m);
    }

    #[test]
    fn test_resumed_altitude_is_pulled_into_envelope() {
        let start = c(0.0, 0.0);
        let leg = Leg::new(start, c(0.0, 0.0005), SpeedMode::Walk.band());
        let (samples, _) = collect_leg(&mut seeded(8), leg, MotionState::resumed(start, 10.0, 900.0));
        for s in &samples {
            assert!(s.altitude <= 150.0);
        }
    }

    #[test]
    fn test_altitude_steps_are_bounded() {
        let start = c(0.0, 0.0);
        let leg = Leg::new(start, c(0.0, 0.002), SpeedMode::Walk.band());
        let (samples, _) = collect_leg(&mut seeded(21), leg, MotionState::new(start, 100.0));
        let max_step = AltitudeConfig::default().max_step();

        let mut last = 100.0;
        for s in &samples {
            assert!((s.altitude - last).abs() <= max_step + 1e-12);
            last = s.altitude;
        }
    }

    #[test]
    fn test_degenerate_leg_is_a_no_op() {
        let p = c(116.4, 39.9);
        let leg = Leg::new(p, p, SpeedMode::Walk.band());
        let state = MotionState::resumed(p, 42.0, 101.5);

        let mut synth = seeded(1);
        let run = synth.leg(leg, state);
        assert_eq!(run.phase(), Phase::Done);
        let (samples, after) = collect_leg(&mut synth, leg, state);
        assert!(samples.is_empty());
        assert_eq!(after, state);
    }

    #[test]
    fn test_centimetre_leg_still_ends_on_a_sample() {
        // 5 cm: above the degenerate threshold, far below one step
        let start = c(0.0, 0.0);
        let end = destination(start, 45.0, 0.05).unwrap();
        let leg = Leg::new(start, end, SpeedBand::new(1.0, 1.0).unwrap());
        let state = MotionState::new(start, 100.0);

        let (samples, after) = collect_leg(&mut seeded(2), leg, state);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].position, end);
        assert_abs_diff_eq!(samples[0].elapsed_time, 0.05, epsilon = 1e-9);
        assert_eq!(after.position, end);
        assert_eq!(after.elapsed_time, samples[0].elapsed_time);
        assert!(after.speed.is_some());
    }

    #[test]
    fn test_fine_cadence_walk_always_ends_on_destination() {
        let start = c(0.0, 0.0);
        let end = c(0.0, 0.001);
        let leg = Leg::new(start, end, SpeedMode::Walk.band());
        let config = SynthConfig {
            cadence_s: 0.1,
            ..SynthConfig::default()
        };

        for seed in 0..60 {
            let mut synth = Synthesizer::new(config.clone(), StdRng::seed_from_u64(seed)).unwrap();
            let (samples, after) = collect_leg(&mut synth, leg, MotionState::new(start, 100.0));
            assert_strictly_increasing(&samples, 0.0);
            let last = samples.last().unwrap();
            assert_eq!(last.position, end, "seed {}", seed);
            assert_eq!(after.elapsed_time, last.elapsed_time, "seed {}", seed);
        }
    }

    #[test]
    fn test_leg_inside_one_step_emits_single_prorated_sample() {
        let start = c(0.0, 0.0);
        let end = destination(start, 90.0, 1.0).unwrap();
        let leg = Leg::new(start, end, SpeedBand::new(2.0, 2.0).unwrap());

        let (samples, after) = collect_leg(&mut seeded(4), leg, MotionState::new(start, 100.0));
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].position, end);
        assert_abs_diff_eq!(samples[0].elapsed_time, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(samples[0].heading, 90.0, epsilon = 1e-6);
        assert_eq!(after.elapsed_time, samples[0].elapsed_time);
    }

    #[test]
    fn test_zero_band_runs_on_floor_speed() {
        let start = c(0.0, 0.0);
        let end = destination(start, 0.0, 5.03).unwrap();
        let leg = Leg::new(start, end, SpeedBand::new(0.0, 0.0).unwrap());

        let (samples, after) = collect_leg(&mut seeded(6), leg, MotionState::new(start, 100.0));
        assert!((45..=55).contains(&samples.len()), "{} samples", samples.len());
        for s in &samples {
            assert_eq!(s.speed, 0.1);
        }
        assert_eq!(samples.last().unwrap().position, end);
        assert_abs_diff_eq!(after.elapsed_time, 50.3, epsilon = 1e-3);
    }

    #[test]
    fn test_zero_band_short_remainder_lands_on_destination() {
        // 5.08 m at 0.1 m steps leaves 8 cm after the last full step
        let start = c(0.0, 0.0);
        let end = destination(start, 0.0, 5.08).unwrap();
        let leg = Leg::new(start, end, SpeedBand::new(0.0, 0.0).unwrap());

        let (samples, after) = collect_leg(&mut seeded(6), leg, MotionState::new(start, 100.0));
        assert_eq!(samples.len(), 51);
        assert_strictly_increasing(&samples, 0.0);
        assert_eq!(samples.last().unwrap().position, end);
        assert_abs_diff_eq!(after.elapsed_time, 50.8, epsilon = 1e-3);
        assert_eq!(after.position, end);
    }

    #[test]
    fn test_state_threads_across_legs() {
        let a = c(0.0, 0.0);
        let b = c(0.0, 0.001);
        let d = c(0.001, 0.001);
        let legs = [
            Leg::new(a, b, SpeedMode::Jog.band()),
            Leg::new(b, d, SpeedMode::Jog.band()),
        ];

        let mut synth = seeded(10);
        let (first, mid) = collect_leg(&mut synth, legs[0], MotionState::new(a, 100.0));
        let (second, end_state) = collect_leg(&mut synth, legs[1], mid);

        assert_strictly_increasing(&first, 0.0);
        assert_strictly_increasing(&second, mid.elapsed_time);

        // Speed and altitude carry over the waypoint; only the heading turns
        let carried = mid.speed.unwrap();
        assert_eq!(second[0].speed, carried);
        let max_step = AltitudeConfig::default().max_step();
        assert!((second[0].altitude - mid.altitude).abs() <= max_step + 1e-12);
        assert_abs_diff_eq!(first[0].heading, 0.0, epsilon = 1e-6);
        assert!((second[0].heading - 90.0).abs() < 0.01);

        assert_eq!(end_state.position, d);
    }

    #[test]
    fn test_track_matches_leg_by_leg() {
        let a = c(121.47, 31.23);
        let b = c(121.48, 31.23);
        let d = c(121.48, 31.24);
        let legs = [
            Leg::new(a, b, SpeedMode::Run.band()),
            Leg::new(b, d, SpeedMode::Drive.band()),
        ];
        let state = MotionState::new(a, 100.0);

        let mut whole = Vec::new();
        let end_whole = seeded(77)
            .synthesize_track(&legs, state, |s| {
                whole.push(*s);
                Ok(())
            })
            .unwrap();

        let mut synth = seeded(77);
        let (mut pieces, mid) = collect_leg(&mut synth, legs[0], state);
        let (rest, end_pieces) = collect_leg(&mut synth, legs[1], mid);
        pieces.extend(rest);

        assert_eq!(whole, pieces);
        assert_eq!(end_whole, end_pieces);
    }

    #[test]
    fn test_same_seed_reproduces_track() {
        let start = c(2.35, 48.85);
        let leg = Leg::new(start, c(2.36, 48.86), SpeedMode::Jog.band());
        let (one, _) = collect_leg(&mut seeded(5), leg, MotionState::new(start, 100.0));
        let (two, _) = collect_leg(&mut seeded(5), leg, MotionState::new(start, 100.0));
        let (three, _) = collect_leg(&mut seeded(6), leg, MotionState::new(start, 100.0));
        assert_eq!(one, two);
        assert_ne!(one, three);
    }

    #[test]
    fn test_fine_cadence_scales_sample_count() {
        let start = c(0.0, 0.0);
        let leg = Leg::new(start, c(0.0, 0.001), SpeedBand::new(1.35, 1.35).unwrap());

        let coarse = SynthConfig::default();
        let fine = SynthConfig {
            cadence_s: 0.1,
            ..SynthConfig::default()
        };
        let count = |config: SynthConfig| {
            let mut synth = Synthesizer::new(config, StdRng::seed_from_u64(1)).unwrap();
            synth.leg(leg, MotionState::new(start, 100.0)).count()
        };

        let n_coarse = count(coarse);
        let n_fine = count(fine);
        assert!(n_fine > 9 * n_coarse && n_fine < 11 * n_coarse);
    }

    #[test]
    fn test_sink_failure_stops_the_run() {
        let start = c(0.0, 0.0);
        let leg = Leg::new(start, c(0.0, 0.001), SpeedMode::Walk.band());
        let mut seen = 0;
        let result = seeded(1).synthesize_track(&[leg], MotionState::new(start, 100.0), |_| {
            seen += 1;
            if seen == 3 {
                Err(TrackError::WriteFailed("disk full".to_string()))
            } else {
                Ok(())
            }
        });
        assert!(matches!(result, Err(TrackError::WriteFailed(_))));
        assert_eq!(seen, 3);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = SynthConfig {
            cadence_s: -1.0,
            ..SynthConfig::default()
        };
        assert!(Synthesizer::new(config, StdRng::seed_from_u64(0)).is_err());
    }

    #[test]
    fn test_from_config_uses_seed() {
        let config = SynthConfig {
            seed: Some(314),
            ..SynthConfig::default()
        };
        let start = c(0.0, 0.0);
        let leg = Leg::new(start, c(0.0, 0.0005), SpeedMode::Walk.band());
        let run = |config: SynthConfig| {
            let mut synth = Synthesizer::from_config(config).unwrap();
            synth
                .leg(leg, MotionState::new(start, 100.0))
                .collect::<Result<Vec<_>>>()
                .unwrap()
        };
        assert_eq!(run(config.clone()), run(config));
    }
}
