//! Day × distance pivot of the dose-rate dataset.

use std::fmt;

use serde::Serialize;

use crate::dataset::Observation;

/// Dose rate used by downstream charts as the safety line [mSv/day]
pub const SAFETY_THRESHOLD_MSV_PER_DAY: f64 = 0.05;

/// Statistics for one (time_day, distance) cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellStats {
    pub time_day: usize,
    pub distance: f64,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two rows
    pub std_dev: Option<f64>,
    /// Share of rows above the safety threshold
    pub exceed_fraction: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    count: usize,
    sum: f64,
    sum_sq: f64,
    exceed: usize,
}

impl Accumulator {
    fn observe(&mut self, value: f64, threshold: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
        if value > threshold {
            self.exceed += 1;
        }
    }

    fn finish(&self, time_day: usize, distance: f64) -> CellStats {
        let n = self.count as f64;
        let mean = self.sum / n;
        let std_dev = if self.count > 1 {
            let var = ((self.sum_sq - n * mean * mean) / (n - 1.0)).max(0.0);
            Some(var.sqrt())
        } else {
            None
        };
        CellStats {
            time_day,
            distance,
            count: self.count,
            mean,
            std_dev,
            exceed_fraction: self.exceed as f64 / n,
        }
    }
}

/// Mean radiation level grouped by `(time_day, distance)`.
///
/// Days are rows and distances are columns, both ascending. Cells with no
/// rows are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadiationPivot {
    pub days: Vec<usize>,
    pub distances: Vec<f64>,
    pub threshold: f64,
    cells: Vec<Option<CellStats>>,
}

impl RadiationPivot {
    pub fn from_observations<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        Self::with_threshold(rows, SAFETY_THRESHOLD_MSV_PER_DAY)
    }

    pub fn with_threshold<'a, I>(rows: I, threshold: f64) -> Self
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        let rows: Vec<&Observation> = rows.into_iter().collect();

        let mut days: Vec<usize> = rows.iter().map(|r| r.time_day).collect();
        days.sort_unstable();
        days.dedup();

        let mut distances: Vec<f64> = rows.iter().map(|r| r.distance).collect();
        distances.sort_by(f64::total_cmp);
        distances.dedup_by(|a, b| a.to_bits() == b.to_bits());

        let mut acc = vec![Accumulator::default(); days.len() * distances.len()];
        for row in &rows {
            let (Ok(d), Ok(k)) = (
                days.binary_search(&row.time_day),
                distances.binary_search_by(|x| x.total_cmp(&row.distance)),
            ) else {
                continue;
            };
            acc[d * distances.len() + k].observe(row.radiation_level, threshold);
        }

        let cells = acc
            .iter()
            .enumerate()
            .map(|(idx, a)| {
                (a.count > 0)
                    .then(|| a.finish(days[idx / distances.len()], distances[idx % distances.len()]))
            })
            .collect();

        Self {
            days,
            distances,
            threshold,
            cells,
        }
    }

    pub fn cell(&self, time_day: usize, distance: f64) -> Option<&CellStats> {
        let d = self.days.binary_search(&time_day).ok()?;
        let k = self
            .distances
            .binary_search_by(|x| x.total_cmp(&distance))
            .ok()?;
        self.cells[d * self.distances.len() + k].as_ref()
    }

    pub fn mean(&self, time_day: usize, distance: f64) -> Option<f64> {
        self.cell(time_day, distance).map(|c| c.mean)
    }

    /// Populated cells in day-major order.
    pub fn cells(&self) -> impl Iterator<Item = &CellStats> {
        self.cells.iter().flatten()
    }

    /// Mean over all days for each distance, weighted by row count.
    pub fn distance_means(&self) -> Vec<(f64, f64)> {
        self.distances
            .iter()
            .map(|&distance| {
                let (sum, count) = self
                    .cells()
                    .filter(|c| c.distance.to_bits() == distance.to_bits())
                    .fold((0.0, 0usize), |(s, n), c| (s + c.mean * c.count as f64, n + c.count));
                (distance, sum / count.max(1) as f64)
            })
            .collect()
    }
}

impl fmt::Display for RadiationPivot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "distance")?;
        for distance in &self.distances {
            write!(f, " {:>14}", format!("{distance}"))?;
        }
        writeln!(f)?;
        writeln!(f, "{:<8}", "time_day")?;

        for &day in &self.days {
            write!(f, "{day:<8}")?;
            for &distance in &self.distances {
                match self.mean(day, distance) {
                    Some(mean) => write!(f, " {mean:>14.6e}")?,
                    None => write!(f, " {:>14}", "NaN")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(day: usize, distance: f64, level: f64) -> Observation {
        Observation {
            base_radiation: 0.06,
            wind_speed: 9.0,
            wind_direction: 45.0,
            rainfall: 3.0,
            core_temperature: 2800.0,
            pressure: 0.84,
            core_damage: 70.0,
            radiation_level: level,
            distance,
            time_day: day,
        }
    }

    #[test]
    fn pivot_groups_by_day_and_distance() {
        let rows = vec![
            row(1, 60.0, 0.02),
            row(0, 10.0, 1.0),
            row(0, 10.0, 3.0),
            row(0, 60.0, 0.04),
            row(1, 10.0, 0.5),
        ];
        let pivot = RadiationPivot::from_observations(&rows);

        assert_eq!(pivot.days, vec![0, 1]);
        assert_eq!(pivot.distances, vec![10.0, 60.0]);
        assert_eq!(pivot.mean(0, 10.0), Some(2.0));
        assert_eq!(pivot.mean(1, 60.0), Some(0.02));
        assert_eq!(pivot.mean(2, 10.0), None);

        let cell = pivot.cell(0, 10.0).unwrap();
        assert_eq!(cell.count, 2);
        assert!((cell.std_dev.unwrap() - 2_f64.sqrt()).abs() < 1e-12);
        assert_eq!(cell.exceed_fraction, 1.0);
        assert_eq!(pivot.cell(1, 60.0).unwrap().std_dev, None);
        assert_eq!(pivot.cell(0, 60.0).unwrap().exceed_fraction, 0.0);
    }

    #[test]
    fn missing_cells_render_as_nan() {
        let rows = vec![row(0, 10.0, 1.0), row(1, 30.0, 2.0)];
        let pivot = RadiationPivot::from_observations(&rows);
        assert_eq!(pivot.cells().count(), 2);
        let text = pivot.to_string();
        assert!(text.contains("NaN"));
        assert!(text.contains("time_day"));
    }

    #[test]
    fn distance_means_weight_by_count() {
        let rows = vec![
            row(0, 10.0, 1.0),
            row(0, 10.0, 1.0),
            row(1, 10.0, 4.0),
        ];
        let pivot = RadiationPivot::from_observations(&rows);
        assert_eq!(pivot.distance_means(), vec![(10.0, 2.0)]);
    }

    #[test]
    fn empty_input_gives_empty_pivot() {
        let pivot = RadiationPivot::from_observations(&Vec::<Observation>::new());
        assert!(pivot.days.is_empty());
        assert!(pivot.distance_means().is_empty());
    }
}
