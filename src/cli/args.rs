use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::constants::{DEFAULT_CHUNK_SAVE_SIZE, DEFAULT_WINDOW_SIZE};

#[derive(Parser)]
#[command(name = "era5-processor")]
#[command(about = "ERA5 reanalysis window-feature pipeline")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean raw per-month extracts: unit conversion, gap interpolation, range checks
    Clean {
        #[arg(short, long, help = "Directory of raw per-month CSV extracts")]
        input_dir: PathBuf,

        #[arg(
            short,
            long,
            default_value = "era5_data_csv_cleaned",
            help = "Directory for *_cleaned.csv output"
        )]
        output_dir: PathBuf,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,
    },

    /// Aggregate cleaned extracts to daily statistics with next-day targets
    Aggregate {
        #[arg(short, long, help = "Directory of *_cleaned.csv files")]
        input_dir: PathBuf,

        #[arg(
            short,
            long,
            default_value = "era5_features",
            help = "Directory for *_daily_features.csv output"
        )]
        output_dir: PathBuf,

        #[arg(long, help = "Also build per-period window features in-process")]
        with_window_features: bool,

        #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
        window_size: usize,

        #[arg(long, default_value_t = DEFAULT_CHUNK_SAVE_SIZE)]
        chunk_size: usize,
    },

    /// Concatenate per-period daily features chronologically into one dataset
    Concat {
        #[arg(
            short,
            long,
            default_value = "era5_features",
            help = "Directory of *_daily_features.csv files"
        )]
        input_dir: PathBuf,

        #[arg(
            short,
            long,
            default_value = "era5_all_daily_features.csv",
            help = "Combined output file"
        )]
        output_file: PathBuf,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,
    },

    /// Build rolling-window features over the concatenated dataset
    Window {
        #[arg(
            short,
            long,
            default_value = "era5_all_daily_features.csv",
            help = "Global daily-feature table from the concat stage"
        )]
        input_file: PathBuf,

        #[arg(
            short,
            long,
            default_value = "era5_all_window_features.csv",
            help = "Model-ready window-feature output"
        )]
        output_file: PathBuf,

        #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
        window_size: usize,

        #[arg(long, default_value_t = DEFAULT_CHUNK_SAVE_SIZE, help = "Rows buffered before each incremental flush")]
        chunk_size: usize,

        #[arg(long, help = "Persist full f64 precision instead of narrowing to f32")]
        full_precision: bool,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,
    },
}
