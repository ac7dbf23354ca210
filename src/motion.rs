//! Auto-correlated speed model.
//!
//! First-order auto-regressive random walk: every cadence tick pulls the
//! current speed a fixed fraction of the way towards a fresh uniform draw from
//! the leg's band, then clamps it to `[0.8·min, 1.2·max]` and floors it so a
//! leg always makes forward progress.

use rand::Rng;

use crate::types::SpeedBand;

/// Fraction of the gap to the drawn target closed per tick
pub const DEFAULT_SMOOTHING_GAIN: f64 = 0.15;
/// Lowest speed the model will ever report (m/s)
pub const DEFAULT_SPEED_FLOOR: f64 = 0.1;

#[derive(Clone, Debug)]
pub struct MotionProfile {
    speed: f64,
    gain: f64,
    floor: f64,
}

impl MotionProfile {
    /// Enters a leg with `band`, continuing from `previous` when the track
    /// already has a speed, otherwise starting from a uniform draw.
    pub fn enter<R: Rng + ?Sized>(
        band: &SpeedBand,
        previous: Option<f64>,
        gain: f64,
        floor: f64,
        rng: &mut R,
    ) -> Self {
        let initial = match previous {
            Some(speed) => speed,
            None => draw(band, rng),
        };
        let mut profile = MotionProfile {
            speed: initial,
            gain,
            floor,
        };
        profile.speed = profile.bounded(initial, band);
        profile
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// One cadence tick of the random walk. Returns the new speed.
    pub fn advance<R: Rng + ?Sized>(&mut self, band: &SpeedBand, rng: &mut R) -> f64 {
        let target = draw(band, rng);
        let next = self.speed + self.gain * (target - self.speed);
        self.speed = self.bounded(next, band);
        self.speed
    }

    fn bounded(&self, speed: f64, band: &SpeedBand) -> f64 {
        speed
            .clamp(band.lower_limit(), band.upper_limit())
            .max(self.floor)
    }
}

fn draw<R: Rng + ?Sized>(band: &SpeedBand, rng: &mut R) -> f64 {
    if band.max() > band.min() {
        rng.gen_range(band.min()..=band.max())
    } else {
        band.min()
    }
}
