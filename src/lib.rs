//! plume-dose - Monte Carlo Gaussian-plume dose-rate estimation
//!
//! Samples source-term and weather conditions for a hypothetical reactor
//! release, propagates each trial through a time-stepped Gaussian-plume
//! transport and decay model, and assembles a flat dataset of dose rates
//! per (trial, day, distance).

pub mod config;
pub mod dataset;
pub mod output;
pub mod sampler;
pub mod simulation;
pub mod summary;
pub mod transport;
pub mod von_mises;

use thiserror::Error;

// Re-export main types
pub use config::{ModelConstants, SamplingPriors, SimulationConfig, StabilityClass};
pub use dataset::{Dataset, Observation, Observations, Trial, OBSERVATION_COLUMNS};
pub use output::{create_timestamped_output_dir, read_observations_csv, write_observations_csv};
pub use sampler::{ParameterSampler, TrialParams};
pub use simulation::{PlumeSimulation, RunReport};
pub use summary::{CellStats, RadiationPivot, SAFETY_THRESHOLD_MSV_PER_DAY};
pub use transport::{EmissionSource, PlumeModel};
pub use von_mises::VonMises;

#[derive(Debug, Error)]
pub enum PlumeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("dataset is missing column `{0}`")]
    MissingColumn(&'static str),
}
