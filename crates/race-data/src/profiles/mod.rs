//! Athletic pace profiles.
//!
//! Profiles define a typical flat-ground speed and how much individual
//! entrants vary around it. Scenario builders sample from them to give each
//! participant its own pace.

mod runner;
mod walker;

pub use runner::RunnerProfile;
pub use walker::WalkerProfile;

use rand_distr::{Distribution, Normal};

/// Variance samples are clamped to this range around 1.0.
const VARIANCE_CLAMP: (f64, f64) = (0.7, 1.4);

/// Trait for athletic performance profiles.
pub trait AthleteProfile: Send + Sync {
    /// Base speed on flat terrain in meters per second.
    fn base_speed_mps(&self) -> f64;

    /// Person-to-person variance as a coefficient of variation (0.0 - 1.0).
    ///
    /// A value of 0.1 means entrants typically differ by ±10% from the base.
    fn variance(&self) -> f64;

    /// Lateral footprint in meters.
    fn width_m(&self) -> f64 {
        course::DEFAULT_PARTICIPANT_WIDTH_M
    }

    /// Base pace in seconds per kilometer.
    fn base_pace_s_per_km(&self) -> f64 {
        1000.0 / self.base_speed_mps()
    }
}

/// Samples a multiplier around 1.0 from a normal distribution with the given
/// coefficient of variation.
pub fn sample_factor(std_dev: f64, rng: &mut impl rand::Rng) -> f64 {
    if std_dev <= 0.0 {
        return 1.0;
    }
    match Normal::new(1.0, std_dev) {
        Ok(normal) => {
            let sample: f64 = normal.sample(rng);
            sample.clamp(VARIANCE_CLAMP.0, VARIANCE_CLAMP.1)
        }
        Err(_) => 1.0,
    }
}

/// Samples a speed multiplier for one entrant of `profile`.
pub fn sample_variance(profile: &dyn AthleteProfile, rng: &mut impl rand::Rng) -> f64 {
    sample_factor(profile.variance(), rng)
}

/// Samples a pace in seconds per kilometer for one entrant of `profile`.
pub fn sample_pace(profile: &dyn AthleteProfile, rng: &mut impl rand::Rng) -> f64 {
    let speed = profile.base_speed_mps() * sample_variance(profile, rng);
    1000.0 / speed.max(0.5) // Minimum 0.5 m/s keeps paces finite
}
