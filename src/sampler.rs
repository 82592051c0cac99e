//! Per-trial parameter sampling.
//!
//! Each attribute is drawn as a whole column from the caller's RNG, in a
//! fixed order, so one seeded stream reproduces the full trial table.

use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};

use crate::config::{NormalPrior, SamplingPriors};
use crate::von_mises::VonMises;
use crate::PlumeError;

/// Scalar attributes of one Monte Carlo trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialParams {
    /// Reference dose rate [mSv/day], reported only
    pub base_radiation: f64,
    /// [m/s]
    pub wind_speed: f64,
    /// [deg], in `[0, 360)`
    pub wind_direction: f64,
    /// [mm/day]
    pub rainfall: f64,
    /// [deg C]
    pub core_temperature: f64,
    /// [MPa]
    pub pressure: f64,
    /// [%]
    pub core_damage: f64,
}

#[derive(Debug, Clone, Copy)]
struct ClampedNormal {
    normal: Normal<f64>,
    clamp: Option<(f64, f64)>,
}

impl ClampedNormal {
    fn new(name: &str, prior: &NormalPrior) -> Result<Self, PlumeError> {
        let normal = Normal::new(prior.mean, prior.std_dev)
            .map_err(|e| PlumeError::InvalidConfig(format!("{name}: {e}")))?;
        Ok(Self {
            normal,
            clamp: prior.clamp,
        })
    }

    fn column<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<f64> {
        (0..n)
            .map(|_| {
                let x = self.normal.sample(rng);
                match self.clamp {
                    Some((low, high)) => x.clamp(low, high),
                    None => x,
                }
            })
            .collect()
    }
}

/// Draws trial parameters from a fixed set of priors.
#[derive(Debug, Clone, Copy)]
pub struct ParameterSampler {
    base_radiation: ClampedNormal,
    wind_speed: ClampedNormal,
    primary_lobe: VonMises,
    secondary_lobe: VonMises,
    rainfall: ClampedNormal,
    core_temperature: ClampedNormal,
    pressure: ClampedNormal,
    core_damage: Uniform<f64>,
}

impl ParameterSampler {
    pub fn new(priors: &SamplingPriors) -> Result<Self, PlumeError> {
        priors.validate()?;

        let lobes = &priors.wind_direction;
        let lobe = |deg: f64| {
            VonMises::new(deg.to_radians(), lobes.kappa)
                .map_err(|e| PlumeError::InvalidConfig(format!("wind_direction: {e}")))
        };
        let (damage_low, damage_high) = priors.core_damage;

        Ok(Self {
            base_radiation: ClampedNormal::new("base_radiation", &priors.base_radiation)?,
            wind_speed: ClampedNormal::new("wind_speed", &priors.wind_speed)?,
            primary_lobe: lobe(lobes.primary_deg)?,
            secondary_lobe: lobe(lobes.secondary_deg)?,
            rainfall: ClampedNormal::new("rainfall", &priors.rainfall)?,
            core_temperature: ClampedNormal::new("core_temperature", &priors.core_temperature)?,
            pressure: ClampedNormal::new("pressure", &priors.pressure)?,
            core_damage: Uniform::new(damage_low, damage_high),
        })
    }

    /// Draw `num_samples` trials. The first `num_samples / 2` wind
    /// directions come from the primary lobe, the rest from the secondary.
    pub fn sample<R: Rng + ?Sized>(&self, num_samples: usize, rng: &mut R) -> Vec<TrialParams> {
        let base_radiation = self.base_radiation.column(num_samples, rng);
        let wind_speed = self.wind_speed.column(num_samples, rng);
        let wind_direction = self.wind_direction_column(num_samples, rng);
        let rainfall = self.rainfall.column(num_samples, rng);
        let core_temperature = self.core_temperature.column(num_samples, rng);
        let pressure = self.pressure.column(num_samples, rng);
        let core_damage: Vec<f64> = (0..num_samples)
            .map(|_| self.core_damage.sample(rng))
            .collect();

        (0..num_samples)
            .map(|i| TrialParams {
                base_radiation: base_radiation[i],
                wind_speed: wind_speed[i],
                wind_direction: wind_direction[i],
                rainfall: rainfall[i],
                core_temperature: core_temperature[i],
                pressure: pressure[i],
                core_damage: core_damage[i],
            })
            .collect()
    }

    fn wind_direction_column<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<f64> {
        let first = n / 2;
        (0..n)
            .map(|i| {
                let lobe = if i < first {
                    &self.primary_lobe
                } else {
                    &self.secondary_lobe
                };
                wrap_degrees(lobe.sample(rng).to_degrees())
            })
            .collect()
    }
}

/// Wrap an angle in degrees onto `[0, 360)`.
pub fn wrap_degrees(deg: f64) -> f64 {
    let wrapped = (deg + 360.0).rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
