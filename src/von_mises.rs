//! Von Mises (circular normal) distribution.
//!
//! `rand_distr` 0.4 has no circular distributions, so this provides one with
//! the same `Distribution` interface. Samples use the Best–Fisher rejection
//! scheme and are returned in radians on `[-π, π)`.

use std::f64::consts::{PI, TAU};

use rand::Rng;
use rand_distr::Distribution;
use thiserror::Error;

/// Below this concentration the distribution is treated as uniform on the circle.
const KAPPA_UNIFORM: f64 = 1e-8;
/// Below this concentration the envelope parameter uses its series form.
const KAPPA_SMALL: f64 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VonMisesError {
    #[error("von Mises mean direction must be finite")]
    MeanNotFinite,
    #[error("von Mises concentration must be finite and non-negative")]
    BadConcentration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VonMises {
    mu: f64,
    kappa: f64,
    s: f64,
}

impl VonMises {
    /// Mean direction `mu` in radians, concentration `kappa`.
    pub fn new(mu: f64, kappa: f64) -> Result<Self, VonMisesError> {
        if !mu.is_finite() {
            return Err(VonMisesError::MeanNotFinite);
        }
        if !kappa.is_finite() || kappa < 0.0 {
            return Err(VonMisesError::BadConcentration);
        }

        let s = if kappa < KAPPA_UNIFORM {
            0.0
        } else if kappa < KAPPA_SMALL {
            1.0 / kappa + kappa
        } else {
            let r = 1.0 + (1.0 + 4.0 * kappa * kappa).sqrt();
            let rho = (r - (2.0 * r).sqrt()) / (2.0 * kappa);
            (1.0 + rho * rho) / (2.0 * rho)
        };

        Ok(Self { mu, kappa, s })
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn kappa(&self) -> f64 {
        self.kappa
    }
}

impl Distribution<f64> for VonMises {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.kappa < KAPPA_UNIFORM {
            return PI * (2.0 * rng.gen::<f64>() - 1.0);
        }

        let w = loop {
            let u: f64 = rng.gen();
            let z = (PI * u).cos();
            let w = (1.0 + self.s * z) / (self.s + z);
            let y = self.kappa * (self.s - w);
            let v: f64 = rng.gen();
            if y * (2.0 - y) - v >= 0.0 || (y / v).ln() + 1.0 - y >= 0.0 {
                break w;
            }
        };

        let mut offset = w.clamp(-1.0, 1.0).acos();
        if rng.gen::<f64>() < 0.5 {
            offset = -offset;
        }

        wrap_to_pi(self.mu + offset)
    }
}

/// Wrap an angle in radians onto `[-π, π)`.
pub fn wrap_to_pi(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    // rem_euclid rounds tiny negative remainders up to exactly TAU.
    if wrapped >= PI {
        wrapped - TAU
    } else {
        wrapped
    }
}
