//! Run configuration, physical constants and sampling priors.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

use crate::PlumeError;

pub const DEFAULT_NUM_SAMPLES: usize = 1000;
pub const DEFAULT_TIME_STEPS: usize = 7;
pub const DEFAULT_DISTANCES_KM: [f64; 4] = [10.0, 30.0, 60.0, 100.0];
pub const DEFAULT_SEED: u64 = 0x5EED_2011_0311_u64;

/// Cs-137 half-life [years]
pub const CS137_HALF_LIFE_YEARS: f64 = 30.17;

/// Pasquill-Gifford stability class.
///
/// Carried through the configuration and the run manifest only. The sigma
/// curves in [`crate::transport`] are fixed and do not read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StabilityClass {
    A,
    B,
    C,
    #[default]
    D,
    E,
    F,
}

impl fmt::Display for StabilityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
        };
        f.write_str(label)
    }
}

/// Fixed physical constants of the transport model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConstants {
    /// Baseline source emission rate [Bq/s]
    pub q_base: f64,
    /// Effective release height [m]
    pub release_height_m: f64,
    /// Dose conversion factor [mSv/day per Bq/m^3]
    pub gamma: f64,
    /// Radioactive decay constant [1/day]
    pub decay_constant: f64,
    pub stability_class: StabilityClass,
    /// Nominal core temperature for the source scaling [deg C]
    pub nominal_core_temperature: f64,
    /// Nominal primary pressure for the source scaling [MPa]
    pub nominal_pressure: f64,
    /// Nominal core damage for the source scaling [%]
    pub nominal_core_damage: f64,
}

impl Default for ModelConstants {
    fn default() -> Self {
        Self {
            q_base: 1.5e10,
            release_height_m: 100.0,
            gamma: 3.26e-5,
            decay_constant: std::f64::consts::LN_2 / (CS137_HALF_LIFE_YEARS * 365.0),
            stability_class: StabilityClass::D,
            nominal_core_temperature: 2800.0,
            nominal_pressure: 0.84,
            nominal_core_damage: 70.0,
        }
    }
}

impl ModelConstants {
    pub fn validate(&self) -> Result<(), PlumeError> {
        ensure_positive("q_base", self.q_base)?;
        ensure_positive("gamma", self.gamma)?;
        ensure_positive("nominal_core_temperature", self.nominal_core_temperature)?;
        ensure_positive("nominal_pressure", self.nominal_pressure)?;
        ensure_positive("nominal_core_damage", self.nominal_core_damage)?;

        if !self.release_height_m.is_finite() || self.release_height_m < 0.0 {
            return Err(PlumeError::InvalidConfig(
                "release_height_m must be finite and non-negative".to_string(),
            ));
        }

        if !self.decay_constant.is_finite() || self.decay_constant < 0.0 {
            return Err(PlumeError::InvalidConfig(
                "decay_constant must be finite and non-negative".to_string(),
            ));
        }

        Ok(())
    }
}

/// Normal prior with an optional clamp range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalPrior {
    pub mean: f64,
    pub std_dev: f64,
    #[serde(default)]
    pub clamp: Option<(f64, f64)>,
}

impl NormalPrior {
    pub const fn new(mean: f64, std_dev: f64) -> Self {
        Self {
            mean,
            std_dev,
            clamp: None,
        }
    }

    pub const fn clamped(mean: f64, std_dev: f64, low: f64, high: f64) -> Self {
        Self {
            mean,
            std_dev,
            clamp: Some((low, high)),
        }
    }

    fn validate(&self, name: &str) -> Result<(), PlumeError> {
        if !self.mean.is_finite() {
            return Err(PlumeError::InvalidConfig(format!(
                "{name}: mean must be finite"
            )));
        }
        ensure_positive(&format!("{name}.std_dev"), self.std_dev)?;
        if let Some((low, high)) = self.clamp {
            if !low.is_finite() || !high.is_finite() || low > high {
                return Err(PlumeError::InvalidConfig(format!(
                    "{name}: clamp range must be finite with low <= high"
                )));
            }
        }
        Ok(())
    }
}

/// Two opposing von Mises lobes for the wind direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindDirectionPrior {
    /// Centre of the lobe used for the first half of the trials [deg]
    pub primary_deg: f64,
    /// Centre of the lobe used for the second half of the trials [deg]
    pub secondary_deg: f64,
    /// Von Mises concentration shared by both lobes
    pub kappa: f64,
}

/// Distribution parameters for the per-trial sampler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingPriors {
    /// [mSv/day]
    pub base_radiation: NormalPrior,
    /// [m/s]
    pub wind_speed: NormalPrior,
    pub wind_direction: WindDirectionPrior,
    /// [mm/day]
    pub rainfall: NormalPrior,
    /// [deg C]
    pub core_temperature: NormalPrior,
    /// [MPa]
    pub pressure: NormalPrior,
    /// Uniform range for core damage [%]
    pub core_damage: (f64, f64),
}

impl Default for SamplingPriors {
    fn default() -> Self {
        Self {
            base_radiation: NormalPrior::new(0.06, 0.01),
            wind_speed: NormalPrior::clamped(9.3, 1.5, 3.0, 15.0),
            wind_direction: WindDirectionPrior {
                primary_deg: 45.0,
                secondary_deg: 225.0,
                kappa: 2.0,
            },
            rainfall: NormalPrior::clamped(3.1, 1.0, 0.0, 10.0),
            core_temperature: NormalPrior::new(2800.0, 200.0),
            pressure: NormalPrior::new(0.84, 0.1),
            core_damage: (60.0, 90.0),
        }
    }
}

impl SamplingPriors {
    pub fn validate(&self) -> Result<(), PlumeError> {
        self.base_radiation.validate("base_radiation")?;
        self.wind_speed.validate("wind_speed")?;
        self.rainfall.validate("rainfall")?;
        self.core_temperature.validate("core_temperature")?;
        self.pressure.validate("pressure")?;

        let lobes = &self.wind_direction;
        if !lobes.primary_deg.is_finite() || !lobes.secondary_deg.is_finite() {
            return Err(PlumeError::InvalidConfig(
                "wind_direction lobe centres must be finite".to_string(),
            ));
        }
        ensure_positive("wind_direction.kappa", lobes.kappa)?;

        let (low, high) = self.core_damage;
        if !low.is_finite() || !high.is_finite() || low >= high {
            return Err(PlumeError::InvalidConfig(
                "core_damage range must be finite with low < high".to_string(),
            ));
        }

        Ok(())
    }
}

/// Top-level configuration for a Monte Carlo dispersion run.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    #[serde_as(as = "DefaultOnNull")]
    pub num_samples: usize,
    /// Downwind receptor distances [km]
    #[serde_as(as = "DefaultOnNull")]
    pub distances_km: Vec<f64>,
    /// Number of simulated days
    #[serde_as(as = "DefaultOnNull")]
    pub time_steps: usize,
    #[serde_as(as = "DefaultOnNull")]
    pub seed: u64,
    /// Spread transport across trials with rayon
    #[serde_as(as = "DefaultOnNull")]
    pub parallel: bool,
    pub constants: ModelConstants,
    pub priors: SamplingPriors,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_samples: DEFAULT_NUM_SAMPLES,
            distances_km: DEFAULT_DISTANCES_KM.to_vec(),
            time_steps: DEFAULT_TIME_STEPS,
            seed: DEFAULT_SEED,
            parallel: true,
            constants: ModelConstants::default(),
            priors: SamplingPriors::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), PlumeError> {
        if self.num_samples == 0 {
            return Err(PlumeError::InvalidConfig(
                "num_samples must be greater than zero".to_string(),
            ));
        }

        if self.time_steps == 0 {
            return Err(PlumeError::InvalidConfig(
                "time_steps must be greater than zero".to_string(),
            ));
        }

        if self.distances_km.is_empty() {
            return Err(PlumeError::InvalidConfig(
                "distances_km must contain at least one distance".to_string(),
            ));
        }

        if self
            .distances_km
            .iter()
            .any(|&d| !d.is_finite() || d <= 0.0)
        {
            return Err(PlumeError::InvalidConfig(
                "distances_km must contain only finite values greater than zero".to_string(),
            ));
        }

        for (idx, d) in self.distances_km.iter().enumerate() {
            if self.distances_km[..idx].contains(d) {
                return Err(PlumeError::InvalidConfig(format!(
                    "distances_km contains duplicate distance {d}"
                )));
            }
        }

        if self.row_count().is_none() {
            return Err(PlumeError::InvalidConfig(format!(
                "num_samples * time_steps * distances ({} * {} * {}) overflows the row count",
                self.num_samples,
                self.time_steps,
                self.distances_km.len()
            )));
        }

        self.constants.validate()?;
        self.priors.validate()?;
        Ok(())
    }

    /// Number of observation rows the run produces, `None` on overflow.
    pub fn row_count(&self) -> Option<usize> {
        self.num_samples
            .checked_mul(self.time_steps)?
            .checked_mul(self.distances_km.len())
    }

    /// Number of observation rows the run produces, saturating at `usize::MAX`.
    pub fn expected_rows(&self) -> usize {
        self.row_count().unwrap_or(usize::MAX)
    }
}

fn ensure_positive(name: &str, value: f64) -> Result<(), PlumeError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PlumeError::InvalidConfig(format!(
            "{name} must be finite and greater than zero"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.row_count(), Some(1000 * 7 * 4));
        assert_eq!(config.expected_rows(), 1000 * 7 * 4);
    }

    #[test]
    fn decay_constant_matches_cs137() {
        let constants = ModelConstants::default();
        let half_life_days = std::f64::consts::LN_2 / constants.decay_constant;
        assert!((half_life_days - 30.17 * 365.0).abs() < 1e-6);
    }

    #[test]
    fn zero_samples_rejected() {
        let config = SimulationConfig {
            num_samples: 0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PlumeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_time_steps_rejected() {
        let config = SimulationConfig {
            time_steps: 0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_and_bad_distances_rejected() {
        for distances in [vec![], vec![10.0, -5.0], vec![f64::NAN], vec![30.0, 30.0]] {
            let config = SimulationConfig {
                distances_km: distances.clone(),
                ..SimulationConfig::default()
            };
            assert!(config.validate().is_err(), "accepted {distances:?}");
        }
    }

    #[test]
    fn overflowing_row_count_rejected() {
        let config = SimulationConfig {
            num_samples: 2,
            time_steps: 1 << (usize::BITS - 1),
            distances_km: vec![10.0],
            parallel: false,
            ..SimulationConfig::default()
        };
        assert_eq!(config.row_count(), None);
        assert_eq!(config.expected_rows(), usize::MAX);
        assert!(matches!(
            config.validate(),
            Err(PlumeError::InvalidConfig(msg)) if msg.contains("overflows")
        ));
        assert!(crate::PlumeSimulation::new(config).is_err());
    }

    #[test]
    fn bad_priors_rejected() {
        let mut priors = SamplingPriors::default();
        priors.wind_speed.std_dev = 0.0;
        assert!(priors.validate().is_err());

        let mut priors = SamplingPriors::default();
        priors.rainfall.clamp = Some((10.0, 0.0));
        assert!(priors.validate().is_err());

        let mut priors = SamplingPriors::default();
        priors.core_damage = (90.0, 60.0);
        assert!(priors.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let raw = r#"{ "num_samples": 12, "parallel": null, "constants": { "gamma": 1.0 } }"#;
        let config: SimulationConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.num_samples, 12);
        assert!(!config.parallel);
        assert_eq!(config.time_steps, DEFAULT_TIME_STEPS);
        assert_eq!(config.distances_km, DEFAULT_DISTANCES_KM.to_vec());
        assert_eq!(config.constants.gamma, 1.0);
        assert_eq!(config.constants.q_base, 1.5e10);
        assert_eq!(config.constants.stability_class, StabilityClass::D);
    }
}
