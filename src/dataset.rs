//! Observation rows and the table that holds them.

use serde::{Deserialize, Serialize};

use crate::sampler::TrialParams;
use crate::transport::{EmissionSource, PlumeModel};

/// Column names of the exported dataset, in row order.
pub const OBSERVATION_COLUMNS: [&str; 10] = [
    "base_radiation",
    "wind_speed",
    "wind_direction",
    "rainfall",
    "core_temperature",
    "pressure",
    "core_damage",
    "radiation_level",
    "distance",
    "time_day",
];

/// One (trial, day, distance) combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub base_radiation: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub rainfall: f64,
    pub core_temperature: f64,
    pub pressure: f64,
    pub core_damage: f64,
    /// [mSv/day]
    pub radiation_level: f64,
    /// [km]
    pub distance: f64,
    pub time_day: usize,
}

impl Observation {
    fn new(params: &TrialParams, radiation_level: f64, distance: f64, time_day: usize) -> Self {
        Self {
            base_radiation: params.base_radiation,
            wind_speed: params.wind_speed,
            wind_direction: params.wind_direction,
            rainfall: params.rainfall,
            core_temperature: params.core_temperature,
            pressure: params.pressure,
            core_damage: params.core_damage,
            radiation_level,
            distance,
            time_day,
        }
    }
}

/// A sampled trial paired with its derived emission source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trial {
    pub params: TrialParams,
    pub source: EmissionSource,
}

impl Trial {
    pub fn new(model: &PlumeModel, params: TrialParams) -> Self {
        Self {
            params,
            source: model.emission_source(&params),
        }
    }
}

/// Lazy producer of observations over trials × days × distances.
///
/// Trial is the outer loop, day the middle and distance the inner. Cloning
/// restarts from the clone point.
#[derive(Debug, Clone)]
pub struct Observations<'a> {
    model: &'a PlumeModel,
    trials: &'a [Trial],
    distances_km: &'a [f64],
    time_steps: usize,
    cursor: usize,
}

impl<'a> Observations<'a> {
    pub fn new(
        model: &'a PlumeModel,
        trials: &'a [Trial],
        distances_km: &'a [f64],
        time_steps: usize,
    ) -> Self {
        Self {
            model,
            trials,
            distances_km,
            time_steps,
            cursor: 0,
        }
    }

    fn total(&self) -> usize {
        self.trials
            .len()
            .saturating_mul(self.time_steps)
            .saturating_mul(self.distances_km.len())
    }
}

impl Iterator for Observations<'_> {
    type Item = Observation;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.total() {
            return None;
        }

        let per_day = self.distances_km.len();
        let per_trial = self.time_steps * per_day;
        let trial = &self.trials[self.cursor / per_trial];
        let day = (self.cursor % per_trial) / per_day;
        let distance = self.distances_km[self.cursor % per_day];
        self.cursor += 1;

        let level = self.model.radiation_level(&trial.source, day, distance);
        Some(Observation::new(&trial.params, level, distance, day))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total().saturating_sub(self.cursor);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Observations<'_> {}

/// Ordered, uniformly shaped observation rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    rows: Vec<Observation>,
}

impl Dataset {
    pub fn from_observations<I>(observations: I) -> Self
    where
        I: IntoIterator<Item = Observation>,
    {
        Self {
            rows: observations.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.rows.iter()
    }

    pub fn head(&self, n: usize) -> &[Observation] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Extract one numeric column in row order.
    pub fn column(&self, field: impl Fn(&Observation) -> f64) -> Vec<f64> {
        self.rows.iter().map(field).collect()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(wind_speed: f64) -> TrialParams {
        TrialParams {
            base_radiation: 0.06,
            wind_speed,
            wind_direction: 225.0,
            rainfall: 2.0,
            core_temperature: 2900.0,
            pressure: 0.9,
            core_damage: 80.0,
        }
    }

    #[test]
    fn iteration_order_is_trial_day_distance() {
        let model = PlumeModel::default();
        let trials: Vec<Trial> = [5.0, 12.0]
            .into_iter()
            .map(|u| Trial::new(&model, trial(u)))
            .collect();
        let distances = [10.0, 60.0, 100.0];
        let rows: Vec<Observation> = Observations::new(&model, &trials, &distances, 2).collect();

        assert_eq!(rows.len(), 2 * 2 * 3);
        let keys: Vec<(f64, usize, f64)> = rows
            .iter()
            .map(|r| (r.wind_speed, r.time_day, r.distance))
            .collect();
        assert_eq!(keys[0], (5.0, 0, 10.0));
        assert_eq!(keys[2], (5.0, 0, 100.0));
        assert_eq!(keys[3], (5.0, 1, 10.0));
        assert_eq!(keys[6], (12.0, 0, 10.0));
        assert_eq!(keys[11], (12.0, 1, 100.0));
    }

    #[test]
    fn size_hint_is_exact_and_restartable() {
        let model = PlumeModel::default();
        let trials = vec![Trial::new(&model, trial(9.0))];
        let distances = [10.0, 30.0];
        let mut iter = Observations::new(&model, &trials, &distances, 3);
        assert_eq!(iter.len(), 6);
        iter.next();
        let restart = iter.clone();
        assert_eq!(iter.len(), 5);
        assert_eq!(restart.collect::<Vec<_>>(), iter.collect::<Vec<_>>());
    }

    #[test]
    fn rows_copy_trial_attributes() {
        let model = PlumeModel::default();
        let params = trial(7.5);
        let trials = vec![Trial::new(&model, params)];
        let dataset = Dataset::from_observations(Observations::new(&model, &trials, &[30.0], 1));
        let row = dataset.rows()[0];
        assert_eq!(row.core_temperature, params.core_temperature);
        assert_eq!(row.wind_direction, params.wind_direction);
        assert_eq!(
            row.radiation_level,
            model.radiation_level(&trials[0].source, 0, 30.0)
        );
    }

    #[test]
    fn head_is_bounded_by_len() {
        let model = PlumeModel::default();
        let trials = vec![Trial::new(&model, trial(9.0))];
        let dataset = Dataset::from_observations(Observations::new(&model, &trials, &[10.0], 2));
        assert_eq!(dataset.head(10).len(), 2);
        assert_eq!(dataset.head(1).len(), 1);
    }

    #[test]
    fn column_follows_row_order() {
        let model = PlumeModel::default();
        let trials: Vec<Trial> = [4.0, 11.0]
            .into_iter()
            .map(|u| Trial::new(&model, trial(u)))
            .collect();
        let dataset = Dataset::from_observations(Observations::new(&model, &trials, &[10.0], 2));
        assert_eq!(
            dataset.column(|row| row.wind_speed),
            vec![4.0, 4.0, 11.0, 11.0]
        );
        assert_eq!(
            dataset.column(|row| row.time_day as f64),
            vec![0.0, 1.0, 0.0, 1.0]
        );
    }

    #[test]
    fn huge_shape_saturates_size_hint() {
        let model = PlumeModel::default();
        let trials = vec![Trial::new(&model, trial(9.0)); 2];
        let iter = Observations::new(&model, &trials, &[10.0], 1 << (usize::BITS - 1));
        assert_eq!(iter.size_hint(), (usize::MAX, Some(usize::MAX)));
    }
}
