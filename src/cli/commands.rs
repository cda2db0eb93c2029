use crate::cli::args::{Cli, Commands};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::processors::{Cleaner, Concatenator, DailyAggregator, WindowFeatureBuilder};
use crate::utils::progress::ProgressReporter;

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Clean {
            input_dir,
            output_dir,
            max_workers,
        } => {
            println!("Cleaning raw ERA5 extracts...");
            println!("Input directory: {}", input_dir.display());
            println!("Output directory: {}", output_dir.display());

            let progress = ProgressReporter::new_spinner("Cleaning files...", false);
            let cleaner = Cleaner::new().with_max_workers(max_workers);
            let reports = cleaner.clean_directory(&input_dir, &output_dir, Some(&progress))?;
            progress.finish_with_message(&format!("Cleaned {} files", reports.len()));

            for report in &reports {
                println!("\n{}", report.summary());
            }
            println!("\nCleaning complete!");
        }

        Commands::Aggregate {
            input_dir,
            output_dir,
            with_window_features,
            window_size,
            chunk_size,
        } => {
            println!("Aggregating cleaned extracts to daily features...");
            println!("Input directory: {}", input_dir.display());
            println!("Output directory: {}", output_dir.display());

            let config = PipelineConfig::new()
                .with_window_size(window_size)
                .with_chunk_save_size(chunk_size);
            config.validate()?;

            let progress = ProgressReporter::new_spinner("Aggregating files...", false);
            let aggregator = DailyAggregator::new(&config);
            let summaries = aggregator.aggregate_directory(
                &input_dir,
                &output_dir,
                &config,
                with_window_features,
                Some(&progress),
            )?;
            progress.finish_with_message(&format!("Aggregated {} files", summaries.len()));

            for summary in &summaries {
                match summary.window_rows {
                    Some(window_rows) => println!(
                        "{}: {} daily rows, {} window rows",
                        summary.file, summary.daily_rows, window_rows
                    ),
                    None => println!("{}: {} daily rows", summary.file, summary.daily_rows),
                }
            }
            println!("\nAggregation complete!");
        }

        Commands::Concat {
            input_dir,
            output_file,
            max_workers,
        } => {
            println!("Concatenating daily features...");
            println!("Input directory: {}", input_dir.display());
            println!("Output file: {}", output_file.display());

            let progress = ProgressReporter::new_spinner("Concatenating...", false);
            let concatenator = Concatenator::new(max_workers);
            let rows = concatenator
                .concatenate_directory(&input_dir, &output_file, Some(&progress))
                .await?;
            progress.finish_with_message(&format!("Combined {} rows", rows));

            println!("\nConcatenation complete!");
        }

        Commands::Window {
            input_file,
            output_file,
            window_size,
            chunk_size,
            full_precision,
            max_workers,
        } => {
            println!("Building rolling-window features...");
            println!("Input file: {}", input_file.display());
            println!("Output file: {}", output_file.display());
            println!("Window size: {}, flush threshold: {}", window_size, chunk_size);

            let config = PipelineConfig::new()
                .with_window_size(window_size)
                .with_chunk_save_size(chunk_size)
                .with_narrow_floats(!full_precision)
                .with_max_workers(max_workers);
            config.validate()?;

            let progress = ProgressReporter::new_spinner("Processing locations...", false);
            let builder = WindowFeatureBuilder::new(config.window_size);
            let summary = builder.build_global(&input_file, &output_file, &config, Some(&progress))?;
            progress.finish_with_message(&format!("Wrote {} rows", summary.rows_written));

            println!(
                "\nProcessed {} locations ({} below window size), {} feature rows written",
                summary.locations, summary.short_series, summary.rows_written
            );
            println!("Window feature build complete!");
        }
    }

    Ok(())
}
