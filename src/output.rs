use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::{Reader, Writer};
use serde::Serialize;

use crate::config::SimulationConfig;
use crate::dataset::{Dataset, Observation, OBSERVATION_COLUMNS};
use crate::summary::RadiationPivot;
use crate::PlumeError;

pub const OBSERVATIONS_FILE: &str = "observations.csv";
pub const PIVOT_FILE: &str = "summary_by_day_distance.csv";
pub const MANIFEST_FILE: &str = "summary.json";

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub config: SimulationConfig,
    pub rows: usize,
    pub generated_at: String,
    pub safety_threshold: f64,
    /// Overall mean radiation level per distance, keyed by the distance label
    pub mean_radiation_by_distance: BTreeMap<String, f64>,
    pub max_radiation_level: f64,
}

impl RunManifest {
    pub fn new(config: &SimulationConfig, dataset: &Dataset, pivot: &RadiationPivot) -> Self {
        Self {
            config: config.clone(),
            rows: dataset.len(),
            generated_at: Utc::now().to_rfc3339(),
            safety_threshold: pivot.threshold,
            mean_radiation_by_distance: pivot
                .distance_means()
                .into_iter()
                .map(|(distance, mean)| (format!("{distance}"), mean))
                .collect(),
            max_radiation_level: dataset
                .iter()
                .map(|row| row.radiation_level)
                .fold(0.0, f64::max),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputFiles {
    pub output_dir: PathBuf,
    pub observations_path: PathBuf,
    pub pivot_path: PathBuf,
    pub manifest_path: PathBuf,
}

impl OutputFiles {
    pub fn in_dir(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            observations_path: output_dir.join(OBSERVATIONS_FILE),
            pivot_path: output_dir.join(PIVOT_FILE),
            manifest_path: output_dir.join(MANIFEST_FILE),
        }
    }
}

/// Create `<base>/<UTC timestamp>`, adding a counter suffix on collision.
pub fn create_timestamped_output_dir(base: &Path) -> Result<PathBuf, PlumeError> {
    fs::create_dir_all(base)?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let mut output_dir = base.join(&timestamp);
    let mut counter = 1_u32;

    while output_dir.exists() {
        output_dir = base.join(format!("{timestamp}-{counter:02}"));
        counter += 1;
    }

    fs::create_dir_all(&output_dir)?;
    Ok(output_dir)
}

/// Write observation rows with a header naming every column.
pub fn write_observations_csv<'a, I>(path: &Path, rows: I) -> Result<usize, PlumeError>
where
    I: IntoIterator<Item = &'a Observation>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(path)?;
    let mut written = 0;
    for row in rows {
        writer.serialize(row)?;
        written += 1;
    }

    // serialize() only emits the header with the first row.
    if written == 0 {
        writer.write_record(OBSERVATION_COLUMNS)?;
    }

    writer.flush()?;
    Ok(written)
}

pub fn read_observations_csv(path: &Path) -> Result<Dataset, PlumeError> {
    let mut reader = Reader::from_path(path)?;

    let headers = reader.headers()?;
    for column in OBSERVATION_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(PlumeError::MissingColumn(column));
        }
    }

    let rows = reader
        .deserialize::<Observation>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Dataset::from_observations(rows))
}

fn fmt_f64(value: f64) -> String {
    format!("{value:.10e}")
}

fn fmt_option_f64(value: Option<f64>) -> String {
    value.map(fmt_f64).unwrap_or_default()
}

pub fn write_pivot_csv(path: &Path, pivot: &RadiationPivot) -> Result<(), PlumeError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record([
        "time_day",
        "distance",
        "count",
        "mean_radiation_level",
        "std_radiation_level",
        "exceed_fraction",
    ])?;

    for cell in pivot.cells() {
        writer.write_record([
            cell.time_day.to_string(),
            cell.distance.to_string(),
            cell.count.to_string(),
            fmt_f64(cell.mean),
            fmt_option_f64(cell.std_dev),
            format!("{:.6}", cell.exceed_fraction),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_manifest(path: &Path, manifest: &RunManifest) -> Result<(), PlumeError> {
    fs::write(path, serde_json::to_string_pretty(manifest)?)?;
    Ok(())
}
