//! Walker athletic profile.

use super::AthleteProfile;

/// Athletic profile for walkers and hikers sharing a course.
///
/// Based on typical recreational walking:
/// - Base speed: ~5.4 km/h (1.5 m/s)
/// - Wider footprint than runners, often walking in pairs
#[derive(Debug, Clone)]
pub struct WalkerProfile {
    /// Base speed in m/s on flat terrain.
    base_speed: f64,
    /// Performance variance (coefficient of variation).
    variance: f64,
    width: f64,
}

impl Default for WalkerProfile {
    fn default() -> Self {
        Self {
            base_speed: 1.5,
            variance: 0.12,
            width: 0.7,
        }
    }
}

impl WalkerProfile {
    /// Creates a new walker profile with specified base speed.
    ///
    /// # Arguments
    /// * `speed_kmh` - Base speed in km/h on flat terrain
    pub fn with_speed(speed_kmh: f64) -> Self {
        Self {
            base_speed: speed_kmh / 3.6,
            ..Default::default()
        }
    }

    /// Creates a fast walker profile (~6.5 km/h base).
    pub fn fast() -> Self {
        Self::with_speed(6.5)
    }

    /// Creates a leisurely walker profile (~4.0 km/h base).
    pub fn leisurely() -> Self {
        Self::with_speed(4.0)
    }
}

impl AthleteProfile for WalkerProfile {
    fn base_speed_mps(&self) -> f64 {
        self.base_speed
    }

    fn variance(&self) -> f64 {
        self.variance
    }

    fn width_m(&self) -> f64 {
        self.width
    }
}
