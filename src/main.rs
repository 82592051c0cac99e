use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use plume_dose::{create_timestamped_output_dir, PlumeSimulation, SimulationConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about = "Monte Carlo Gaussian-plume dose-rate dataset generator")]
struct Cli {
    /// JSON configuration file; `plume_config.json` in the working directory is used if present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output base directory; each run gets a timestamped subdirectory
    #[arg(long, default_value = "output-plume-dose")]
    outdir: PathBuf,

    /// Number of Monte Carlo trials
    #[arg(long)]
    samples: Option<usize>,

    /// Number of simulated days
    #[arg(long)]
    time_steps: Option<usize>,

    /// Receptor distances in km, comma separated
    #[arg(long, value_delimiter = ',')]
    distances: Option<Vec<f64>>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Run transport on a single thread
    #[arg(long, default_value_t = false)]
    sequential: bool,

    /// Number of leading rows to print
    #[arg(long, default_value_t = 10)]
    preview: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut cfg = load_config(cli.config.as_deref())?;
    if let Some(v) = cli.samples {
        cfg.num_samples = v;
    }
    if let Some(v) = cli.time_steps {
        cfg.time_steps = v;
    }
    if let Some(v) = cli.distances {
        cfg.distances_km = v;
    }
    if let Some(v) = cli.seed {
        cfg.seed = v;
    }
    if cli.sequential {
        cfg.parallel = false;
    }

    let simulation = PlumeSimulation::new(cfg).context("invalid simulation configuration")?;
    let output_dir = create_timestamped_output_dir(&cli.outdir)
        .with_context(|| format!("failed to create run directory under {}", cli.outdir.display()))?;
    let report = simulation
        .run_into_dir(&output_dir)
        .with_context(|| format!("failed to write results to {}", output_dir.display()))?;

    println!("Mean radiation_level [mSv/day] by time_day and distance [km]:");
    println!("{}", report.pivot);

    println!(
        "{:>14} {:>10} {:>14} {:>9} {:>16} {:>9} {:>11} {:>15} {:>8} {:>8}",
        "base_radiation",
        "wind_speed",
        "wind_direction",
        "rainfall",
        "core_temperature",
        "pressure",
        "core_damage",
        "radiation_level",
        "distance",
        "time_day"
    );
    for row in report.dataset.head(cli.preview) {
        println!(
            "{:>14.6} {:>10.4} {:>14.3} {:>9.4} {:>16.2} {:>9.4} {:>11.3} {:>15.6e} {:>8} {:>8}",
            row.base_radiation,
            row.wind_speed,
            row.wind_direction,
            row.rainfall,
            row.core_temperature,
            row.pressure,
            row.core_damage,
            row.radiation_level,
            row.distance,
            row.time_day
        );
    }

    println!("Run directory: {}", report.files.output_dir.display());
    println!("CSV: {}", report.files.observations_path.display());
    println!("Pivot: {}", report.files.pivot_path.display());
    println!("Summary: {}", report.files.manifest_path.display());
    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SimulationConfig> {
    if let Some(path) = path {
        return load_config_file(path);
    }

    let cwd_config = PathBuf::from("plume_config.json");
    if cwd_config.exists() {
        return load_config_file(&cwd_config);
    }

    Ok(SimulationConfig::default())
}

fn load_config_file(path: &Path) -> anyhow::Result<SimulationConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: SimulationConfig = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    info!(path = %path.display(), "loaded configuration");
    Ok(config)
}
