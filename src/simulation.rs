//! Monte Carlo driver: sample trials, run transport, assemble the table.

use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::dataset::{Dataset, Observation, Observations, Trial};
use crate::output::{
    write_manifest, write_observations_csv, write_pivot_csv, OutputFiles, RunManifest,
};
use crate::sampler::ParameterSampler;
use crate::summary::RadiationPivot;
use crate::transport::PlumeModel;
use crate::PlumeError;

/// A validated run with its trials already drawn.
#[derive(Debug, Clone)]
pub struct PlumeSimulation {
    config: SimulationConfig,
    model: PlumeModel,
    trials: Vec<Trial>,
}

impl PlumeSimulation {
    /// Validate `config` and draw trials from a `ChaCha8Rng` seeded with `config.seed`.
    pub fn new(config: SimulationConfig) -> Result<Self, PlumeError> {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::with_rng(config, &mut rng)
    }

    /// Validate `config` and draw trials from a caller-supplied generator.
    pub fn with_rng<R: Rng + ?Sized>(
        config: SimulationConfig,
        rng: &mut R,
    ) -> Result<Self, PlumeError> {
        config.validate()?;

        let sampler = ParameterSampler::new(&config.priors)?;
        let model = PlumeModel::new(config.constants);
        let trials = sampler
            .sample(config.num_samples, rng)
            .into_iter()
            .map(|params| Trial::new(&model, params))
            .collect();

        debug!(
            num_samples = config.num_samples,
            stability_class = %config.constants.stability_class,
            "sampled trial parameters"
        );

        Ok(Self {
            config,
            model,
            trials,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn model(&self) -> &PlumeModel {
        &self.model
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Lazy, restartable stream over every (trial, day, distance).
    pub fn observations(&self) -> Observations<'_> {
        Observations::new(
            &self.model,
            &self.trials,
            &self.config.distances_km,
            self.config.time_steps,
        )
    }

    /// Assemble the full table, in parallel across trials when configured.
    pub fn run(&self) -> Dataset {
        info!(
            trials = self.trials.len(),
            days = self.config.time_steps,
            distances = self.config.distances_km.len(),
            parallel = self.config.parallel,
            "running dispersion model"
        );

        let dataset = if self.config.parallel {
            self.run_parallel()
        } else {
            Dataset::from_observations(self.observations())
        };

        debug!(rows = dataset.len(), "dataset assembled");
        dataset
    }

    fn run_parallel(&self) -> Dataset {
        let distances = &self.config.distances_km;
        let time_steps = self.config.time_steps;
        let per_trial: Vec<Vec<Observation>> = self
            .trials
            .par_iter()
            .map(|trial| {
                Observations::new(
                    &self.model,
                    std::slice::from_ref(trial),
                    distances,
                    time_steps,
                )
                .collect()
            })
            .collect();
        Dataset::from_observations(per_trial.into_iter().flatten())
    }

    /// Run and write observations, the day × distance pivot and a JSON
    /// manifest into `output_dir`.
    pub fn run_into_dir(&self, output_dir: &Path) -> Result<RunReport, PlumeError> {
        let dataset = self.run();
        let pivot = RadiationPivot::from_observations(&dataset);
        let files = OutputFiles::in_dir(output_dir);

        let written = write_observations_csv(&files.observations_path, &dataset)?;
        write_pivot_csv(&files.pivot_path, &pivot)?;
        let manifest = RunManifest::new(&self.config, &dataset, &pivot);
        write_manifest(&files.manifest_path, &manifest)?;

        info!(
            rows = written,
            path = %files.observations_path.display(),
            "wrote observations"
        );

        Ok(RunReport {
            dataset,
            pivot,
            manifest,
            files,
        })
    }
}

/// Everything produced by [`PlumeSimulation::run_into_dir`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub dataset: Dataset,
    pub pivot: RadiationPivot,
    pub manifest: RunManifest,
    pub files: OutputFiles,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            num_samples: 25,
            time_steps: 7,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn row_count_matches_product() {
        let config = SimulationConfig {
            num_samples: 9,
            time_steps: 5,
            distances_km: vec![10.0, 60.0, 100.0],
            ..SimulationConfig::default()
        };
        let expected = config.expected_rows();
        let dataset = PlumeSimulation::new(config).unwrap().run();
        assert_eq!(dataset.len(), 9 * 5 * 3);
        assert_eq!(dataset.len(), expected);
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let a = PlumeSimulation::new(small_config()).unwrap().run();
        let b = PlumeSimulation::new(small_config()).unwrap().run();
        assert_eq!(a, b);

        let other = PlumeSimulation::new(SimulationConfig {
            seed: 99,
            ..small_config()
        })
        .unwrap()
        .run();
        assert_ne!(a, other);
    }

    #[test]
    fn parallel_matches_sequential() {
        let parallel = PlumeSimulation::new(small_config()).unwrap().run();
        let sequential = PlumeSimulation::new(SimulationConfig {
            parallel: false,
            ..small_config()
        })
        .unwrap()
        .run();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn no_missing_or_duplicate_triples() {
        let config = small_config();
        let sim = PlumeSimulation::new(config.clone()).unwrap();
        let dataset = sim.run();
        let per_trial = config.time_steps * config.distances_km.len();
        for (idx, row) in dataset.iter().enumerate() {
            let trial = &sim.trials()[idx / per_trial].params;
            assert_eq!(row.wind_speed, trial.wind_speed);
            assert_eq!(row.time_day, (idx % per_trial) / config.distances_km.len());
            assert_eq!(
                row.distance,
                config.distances_km[idx % config.distances_km.len()]
            );
        }
    }

    #[test]
    fn single_trial_matches_model() {
        let config = SimulationConfig {
            num_samples: 1,
            distances_km: vec![60.0],
            time_steps: 1,
            ..SimulationConfig::default()
        };
        let sim = PlumeSimulation::new(config).unwrap();
        let dataset = sim.run();
        assert_eq!(dataset.len(), 1);
        let trial = sim.trials()[0];
        let expected = sim.model().radiation_level(&trial.source, 0, 60.0);
        assert_relative_eq!(dataset.rows()[0].radiation_level, expected);
    }

    #[test]
    fn invalid_config_fails_fast() {
        let config = SimulationConfig {
            distances_km: Vec::new(),
            ..SimulationConfig::default()
        };
        assert!(matches!(
            PlumeSimulation::new(config),
            Err(PlumeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn run_into_dir_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let sim = PlumeSimulation::new(SimulationConfig {
            num_samples: 4,
            time_steps: 2,
            ..SimulationConfig::default()
        })
        .unwrap();
        let report = sim.run_into_dir(dir.path()).unwrap();
        assert_eq!(report.manifest.rows, 4 * 2 * 4);
        assert!(report.files.observations_path.is_file());
        assert!(report.files.pivot_path.is_file());
        assert!(report.files.manifest_path.is_file());
        assert_eq!(report.pivot.days, vec![0, 1]);
    }
}
