//! CLI for outlier detection over feature vectors.

#![deny(clippy::correctness)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::pedantic,
    clippy::nursery,
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::cast_lossless
)]

mod data;
mod utils;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use feature_outliers::{
    Detector, MahalanobisDetector, MahalanobisParams, ParDetector, RansacNNDetector, RansacNNParams,
};
use ftlog::LevelFilter;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The random seed to use. Only RANSAC-NN is randomized.
    #[arg(short('s'), long)]
    seed: Option<u64>,

    /// Where to write the log. Defaults to stderr.
    #[arg(short('l'), long)]
    log_path: Option<PathBuf>,

    /// The most verbose level of log records to keep.
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// The path to the `.npy` file with one feature vector per row.
    inp_path: PathBuf,

    /// A text file with one item identifier per line, in row order.
    #[arg(short('i'), long)]
    items: Option<PathBuf>,

    /// Where to write the CSV scores. Defaults to stdout.
    #[arg(short('o'), long)]
    out_path: Option<PathBuf>,

    /// The detector to run.
    #[command(subcommand)]
    command: Commands,
}

/// The log levels selectable from the command line.
#[derive(ValueEnum, Debug, Clone, Copy)]
enum LogLevel {
    /// No logging.
    Off,
    /// Errors only.
    Error,
    /// Errors and warnings, such as low-confidence RANSAC-NN runs.
    Warn,
    /// Progress of each step.
    Info,
    /// Intermediate results of the detectors.
    Debug,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => Self::Off,
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
        }
    }
}

/// The detectors available in the CLI.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Distance from the mean of a fitted Gaussian.
    Mahalanobis {
        /// Samples farther than this from the mean are outliers.
        #[arg(short('t'), long, default_value_t = MahalanobisParams::default().threshold)]
        threshold: f64,

        /// Added to the diagonal of the covariance matrix before inversion.
        #[arg(short('r'), long)]
        ridge: Option<f64>,
    },
    /// Randomized nearest-neighbor consensus.
    RansacNn {
        /// The fraction of samples in each draw, and of samples flagged.
        #[arg(short('r'), long, default_value_t = RansacNNParams::default().sample_ratio)]
        sample_ratio: f64,

        /// The number of threshold-sweep iterations.
        #[arg(short('t'), long, default_value_t = RansacNNParams::default().threshold_iter)]
        threshold_iter: usize,
    },
}

fn main() -> Result<(), String> {
    let args = Args::parse();

    let _guard = utils::configure_logger(args.log_path.as_deref(), args.log_level.into())?;
    ftlog::info!("Args: {args:?}");

    let features = data::read_features(&args.inp_path)?;
    let items = data::read_items(args.items.as_ref(), features.cardinality())?;
    let out_path = args.out_path.as_deref();

    match args.command {
        Commands::Mahalanobis { threshold, ridge } => {
            let mut detector = match ridge {
                Some(ridge) => MahalanobisDetector::with_ridge(features, ridge),
                None => MahalanobisDetector::new(features),
            }
            .map_err(|e| e.to_string())?;
            let params = MahalanobisParams::default().with_threshold(threshold);
            run(&mut detector, &params, &items, out_path)
        }
        Commands::RansacNn {
            sample_ratio,
            threshold_iter,
        } => {
            let mut params = RansacNNParams::default()
                .with_sample_ratio(sample_ratio)
                .with_threshold_iter(threshold_iter);
            params.seed = args.seed;

            let mut detector = RansacNNDetector::new(features);
            run(&mut detector, &params, &items, out_path)?;
            if detector.is_low_confidence() {
                eprintln!(
                    "Warning: the scores are not discriminative ({} of {threshold_iter} iterations skipped).",
                    detector.skipped_iterations()
                );
            }
            Ok(())
        }
    }
}

/// Runs a detector and writes its scores as CSV.
fn run<D: ParDetector>(
    detector: &mut D,
    params: &D::Params,
    items: &[String],
    out_path: Option<&Path>,
) -> Result<(), String> {
    let outliers = detector.par_detect(params).map_err(|e| e.to_string())?;
    ftlog::info!(
        "{} flagged {} of {} samples.",
        detector.name(),
        outliers.len(),
        detector.num_samples()
    );

    match out_path {
        Some(path) => {
            let file = std::fs::File::create(path).map_err(|e| e.to_string())?;
            data::write_scores(detector, items, file)?;
            ftlog::info!("Wrote scores to {}.", path.display());
            Ok(())
        }
        None => data::write_scores(detector, items, std::io::stdout().lock()),
    }
}
