//! Runner athletic profile.

use super::AthleteProfile;

/// Athletic profile for running races.
///
/// Based on typical recreational to competitive runner performance:
/// - Base pace: ~5:00/km (3.33 m/s)
/// - Field spread of about ±8%
#[derive(Debug, Clone)]
pub struct RunnerProfile {
    /// Base speed in m/s on flat terrain.
    base_speed: f64,
    /// Performance variance (coefficient of variation).
    variance: f64,
}

impl Default for RunnerProfile {
    fn default() -> Self {
        Self::with_pace(5.0)
    }
}

impl RunnerProfile {
    /// Creates a new runner profile with specified base pace.
    ///
    /// # Arguments
    /// * `pace_min_per_km` - Base pace in minutes per kilometer (e.g., 5.0 for 5:00/km)
    pub fn with_pace(pace_min_per_km: f64) -> Self {
        Self {
            base_speed: 1000.0 / (pace_min_per_km * 60.0),
            variance: 0.08,
        }
    }

    /// Creates an elite runner profile (~3:30/km base pace, tight field).
    pub fn elite() -> Self {
        Self {
            variance: 0.04,
            ..Self::with_pace(3.5)
        }
    }

    /// Creates a recreational runner profile (~6:00/km base pace, wide field).
    pub fn recreational() -> Self {
        Self {
            variance: 0.12,
            ..Self::with_pace(6.0)
        }
    }
}

impl AthleteProfile for RunnerProfile {
    fn base_speed_mps(&self) -> f64 {
        self.base_speed
    }

    fn variance(&self) -> f64 {
        self.variance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = RunnerProfile::default();
        assert!((profile.base_pace_s_per_km() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_presets_ordered() {
        assert!(RunnerProfile::elite().base_speed_mps() > RunnerProfile::default().base_speed_mps());
        assert!(
            RunnerProfile::recreational().base_speed_mps() < RunnerProfile::default().base_speed_mps()
        );
        assert!(RunnerProfile::elite().variance() < RunnerProfile::recreational().variance());
    }
}
