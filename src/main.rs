use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use plot_sampler::extract::DateRange;
use plot_sampler::tabular::{read_records_from_path, read_sample_rows_from_path, write_rows, write_rows_to_path};
use plot_sampler::{
    BatchDriver, BatchParams, Config, Crs, Error, FailurePolicy, GeoPoint, Result, SampleRequest,
};

#[derive(Parser)]
#[command(name = "plot-sampler", version, about = "Obfuscated sampling around plot coordinates")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sample every plot of a CSV with plot_ID, LAT and LON columns
    Sample {
        #[arg(short, long)]
        input: PathBuf,
        /// Output CSV, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        radius_ft: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        samples: Option<i64>,
        #[arg(long)]
        seed: Option<u64>,
        /// Abort on the first record that cannot be sampled
        #[arg(long)]
        fail_fast: bool,
    },
    /// Sample around a single coordinate
    Point {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        #[arg(long)]
        radius_ft: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        samples: Option<i64>,
        #[arg(long, default_value = "EPSG:4326")]
        crs: String,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Extract dataset values at sampled points (plot_ID, lon, lat)
    Extract {
        #[arg(short, long)]
        input: PathBuf,
        /// Dataset identifier in the catalog
        #[arg(short, long)]
        dataset: String,
        /// YAML dataset catalog, overriding extract.catalog from the config
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// First date (YYYY-MM-DD) for image collections
        #[arg(long, requires = "end_date")]
        start_date: Option<String>,
        /// Last date (YYYY-MM-DD) for image collections
        #[arg(long, requires = "start_date")]
        end_date: Option<String>,
        /// Average the values of all samples of each plot
        #[arg(long)]
        aggregate: bool,
        /// Output CSV, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let sampler = config.sampler.build_sampler()?;
    let defaults = &config.sampler;

    match cli.command {
        Command::Sample { input, output, radius_ft, samples, seed, fail_fast } => {
            let params = BatchParams::new(
                radius_ft.unwrap_or(defaults.default_radius_ft),
                samples.unwrap_or(defaults.default_sample_count),
            )?;
            let policy = if fail_fast { FailurePolicy::FailFast } else { FailurePolicy::SkipAndReport };

            let records = read_records_from_path(&input)?;
            log::info!("Loaded {} records from {}", records.len(), input.display());

            let driver = BatchDriver::new(sampler, policy);
            let result = match seed {
                Some(seed) => driver.run_parallel(&records, &params, seed)?,
                None => driver.run(&records, &params, &mut rand::rng())?,
            };

            match &output {
                Some(path) => write_rows_to_path(path, &result.rows)?,
                None => write_rows(io::stdout().lock(), &result.rows)?,
            }

            for failure in &result.failures {
                eprintln!("Skipped record {} (plot_ID={}): {}", failure.index, failure.plot_id, failure.error);
            }
            eprintln!(
                "{} records, {} rows written, {} skipped",
                records.len(),
                result.rows.len(),
                result.failures.len()
            );

            Ok(ExitCode::SUCCESS)
        }
        Command::Point { lat, lon, radius_ft, samples, crs, seed } => {
            let crs: Crs = crs.parse()?;
            let request = SampleRequest::new(
                GeoPoint::with_crs(lon, lat, crs),
                radius_ft.unwrap_or(defaults.default_radius_ft),
                samples.unwrap_or(defaults.default_sample_count),
                "point",
            )?;

            let result = match seed {
                Some(seed) => sampler.sample(&request, &mut StdRng::seed_from_u64(seed))?,
                None => sampler.sample(&request, &mut rand::rng())?,
            };

            write_rows(io::stdout().lock(), &result.into_rows())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Extract { input, dataset, catalog, start_date, end_date, aggregate, output } => {
            if catalog.is_some() {
                config.extract.catalog = catalog;
            }
            let extractor = config
                .build_extractor()?
                .ok_or_else(|| Error::Config("no dataset catalog: pass --catalog or set extract.catalog".to_string()))?;

            let range = match (start_date, end_date) {
                (Some(start), Some(end)) => Some(DateRange::parse(&start, &end)?),
                _ => None,
            };

            let points = read_sample_rows_from_path(&input)?;
            log::info!("Loaded {} sample points from {}", points.len(), input.display());

            let table = extractor.extract(&dataset, &points, range)?;
            let body = if aggregate {
                table.aggregate_by_plot().to_csv_string()?
            } else {
                table.to_csv_string()?
            };

            match &output {
                Some(path) => std::fs::write(path, body)?,
                None => io::stdout().lock().write_all(body.as_bytes())?,
            }

            Ok(ExitCode::SUCCESS)
        }
    }
}
