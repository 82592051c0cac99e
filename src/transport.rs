//! Gaussian-plume transport, decay and dose model.
//!
//! Ground-level centreline concentration from a continuous elevated point
//! source, with a piecewise source-term reduction, Cs-137 decay and a
//! precipitation scavenging factor.

use std::f64::consts::PI;

use serde::Serialize;

use crate::config::ModelConstants;
use crate::sampler::TrialParams;

/// Wind speed used in place of an exactly calm sample [m/s].
pub const MIN_WIND_SPEED: f64 = 1e-6;
/// Day after which the source term starts to fall.
pub const SOURCE_PLATEAU_DAYS: usize = 3;
/// Fractional source reduction per day after the plateau.
pub const SOURCE_REDUCTION_PER_DAY: f64 = 0.2;
/// Lowest remaining fraction of the source term.
pub const SOURCE_FLOOR: f64 = 0.2;
/// Reference rainfall for the scavenging factor [mm/day]
pub const SCAVENGING_REFERENCE_RAIN: f64 = 4.45;
pub const SCAVENGING_COEFFICIENT: f64 = 0.05;
pub const RAIN_FACTOR_MIN: f64 = 0.5;
pub const RAIN_FACTOR_MAX: f64 = 1.0;

/// Per-trial release state, computed once and reused for every day and distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmissionSource {
    /// Source rate before any day reduction [Bq/s]
    pub q_base: f64,
    /// Transport wind speed after the calm floor [m/s]
    pub wind_speed: f64,
    /// [mm/day]
    pub rainfall: f64,
}

/// Horizontal and vertical plume spread at one downwind distance [m].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlumeSpread {
    pub sigma_y: f64,
    pub sigma_z: f64,
}

impl PlumeSpread {
    pub fn at_distance_m(x: f64) -> Self {
        Self {
            sigma_y: 0.08 * x * (1.0 + 0.0001 * x).powf(-0.5),
            sigma_z: 0.06 * x * (1.0 + 0.0015 * x).powf(-0.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlumeModel {
    constants: ModelConstants,
}

impl PlumeModel {
    pub fn new(constants: ModelConstants) -> Self {
        Self { constants }
    }

    pub fn constants(&self) -> &ModelConstants {
        &self.constants
    }

    /// Scale the baseline source term by temperature, pressure and damage.
    pub fn emission_source(&self, trial: &TrialParams) -> EmissionSource {
        let c = &self.constants;
        let temp_factor =
            1.0 + (trial.core_temperature - c.nominal_core_temperature) / c.nominal_core_temperature;
        let pressure_factor = 1.0 + (trial.pressure - c.nominal_pressure) / c.nominal_pressure;
        let damage_factor = trial.core_damage / c.nominal_core_damage;

        let wind_speed = if trial.wind_speed == 0.0 {
            MIN_WIND_SPEED
        } else {
            trial.wind_speed
        };

        EmissionSource {
            q_base: c.q_base * temp_factor * pressure_factor * damage_factor,
            wind_speed,
            rainfall: trial.rainfall,
        }
    }

    /// Ground-level centreline concentration [Bq/m^3] before decay and
    /// scavenging.
    pub fn concentration(&self, source_rate: f64, wind_speed: f64, distance_km: f64) -> f64 {
        let spread = PlumeSpread::at_distance_m(distance_km * 1000.0);
        let h = self.constants.release_height_m;
        source_rate / (PI * wind_speed * spread.sigma_y * spread.sigma_z)
            * (-0.5 * (h / spread.sigma_z).powi(2)).exp()
    }

    /// Remaining fraction after `day` days of radioactive decay.
    pub fn decay_factor(&self, day: usize) -> f64 {
        (-self.constants.decay_constant * day as f64).exp()
    }

    /// Dose rate [mSv/day] for one day and receptor distance.
    pub fn radiation_level(&self, source: &EmissionSource, day: usize, distance_km: f64) -> f64 {
        let q = source.q_base * source_term_fraction(day);
        let c = self.concentration(q, source.wind_speed, distance_km)
            * self.decay_factor(day)
            * rain_factor(source.rainfall);
        c * self.constants.gamma
    }
}

impl Default for PlumeModel {
    fn default() -> Self {
        Self::new(ModelConstants::default())
    }
}

/// Share of the base source term still released on `day`.
pub fn source_term_fraction(day: usize) -> f64 {
    let ramp_days = day.saturating_sub(SOURCE_PLATEAU_DAYS) as f64;
    (1.0 - SOURCE_REDUCTION_PER_DAY * ramp_days).max(SOURCE_FLOOR)
}

/// Wet-deposition multiplier, bounded to `[0.5, 1.0]`.
pub fn rain_factor(rainfall: f64) -> f64 {
    (1.0 - SCAVENGING_COEFFICIENT * rainfall / SCAVENGING_REFERENCE_RAIN)
        .clamp(RAIN_FACTOR_MIN, RAIN_FACTOR_MAX)
}
