use std::fs;
use std::io::Write;
use std::path::Path;

use era5_processor::config::PipelineConfig;
use era5_processor::processors::{Cleaner, Concatenator, DailyAggregator, WindowFeatureBuilder};
use tempfile::TempDir;

/// Write a raw per-month extract: one row per (location, day, hour) with
/// t2m equal to the day number and a constant precipitation column.
fn write_raw_month(path: &Path, latitudes: &[f64], days: std::ops::RangeInclusive<u32>) {
    let mut file = fs::File::create(path).unwrap();
    writeln!(file, "valid_time,latitude,longitude,t2m,tp").unwrap();
    for &lat in latitudes {
        for day in days.clone() {
            for hour in [0, 12] {
                writeln!(
                    file,
                    "2023-07-{:02} {:02}:00:00,{},20.0,{},0.001",
                    day, hour, lat, day
                )
                .unwrap();
            }
        }
    }
}

#[tokio::test]
async fn test_full_pipeline_end_to_end() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let raw_dir = temp_dir.path().join("raw");
    let cleaned_dir = temp_dir.path().join("cleaned");
    let features_dir = temp_dir.path().join("features");
    let global_file = temp_dir.path().join("era5_all_daily_features.csv");
    let output_file = temp_dir.path().join("era5_all_window_features.csv");

    fs::create_dir_all(&raw_dir).unwrap();
    write_raw_month(
        &raw_dir.join("era5_full_dataset_2023_07.csv"),
        &[10.0, 10.25],
        1..=11,
    );

    let config = PipelineConfig::new().with_chunk_save_size(4);

    // Stage 1: clean
    let reports = Cleaner::new()
        .with_max_workers(2)
        .clean_directory(&raw_dir, &cleaned_dir, None)
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].final_rows, reports[0].initial_rows);

    // Stage 2: aggregate; day 11 per location is dropped for lacking a successor
    let summaries = DailyAggregator::new(&config)
        .aggregate_directory(&cleaned_dir, &features_dir, &config, false, None)
        .unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].daily_rows, 20);

    // Stage 3: concat
    let rows = Concatenator::new(2)
        .concatenate_directory(&features_dir, &global_file, None)
        .await
        .unwrap();
    assert_eq!(rows, 20);

    // Stage 4: window features; 10 daily records per location at W=7 -> 3 rows
    let summary = WindowFeatureBuilder::new(config.window_size)
        .build_global(&global_file, &output_file, &config, None)
        .unwrap();
    assert_eq!(summary.locations, 2);
    assert_eq!(summary.rows_written, 6);

    let content = fs::read_to_string(&output_file).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 7);

    let header: Vec<&str> = lines[0].split(',').collect();
    assert_eq!(&header[..3], &["date", "latitude", "longitude"]);
    assert!(header.contains(&"t2m_mean_mean"));
    assert!(header.contains(&"t2m_mean_recent_3d"));
    assert!(header.contains(&"tp_mean_trend"));
    assert_eq!(*header.last().unwrap(), "t2m_mean_next");

    // No emitted row may carry an empty (missing) target field
    for line in &lines[1..] {
        assert!(!line.ends_with(','));
    }

    // First feature row: target day 8, window over days 1..=7, so the
    // t2m_mean window mean is 4 and the next-day target is 9
    let first: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(first[0], "2023-07-08");
    let mean_idx = header.iter().position(|h| *h == "t2m_mean_mean").unwrap();
    assert_eq!(first[mean_idx], "4");
    assert_eq!(*first.last().unwrap(), "9");
}

#[tokio::test]
async fn test_rerun_produces_identical_output() {
    let temp_dir = TempDir::new().unwrap();
    let raw_dir = temp_dir.path().join("raw");
    let cleaned_dir = temp_dir.path().join("cleaned");
    let features_dir = temp_dir.path().join("features");
    let global_file = temp_dir.path().join("era5_all_daily_features.csv");
    let output_file = temp_dir.path().join("era5_all_window_features.csv");

    fs::create_dir_all(&raw_dir).unwrap();
    write_raw_month(
        &raw_dir.join("era5_full_dataset_2023_07.csv"),
        &[10.0],
        1..=12,
    );

    let config = PipelineConfig::new();
    Cleaner::new()
        .clean_directory(&raw_dir, &cleaned_dir, None)
        .unwrap();
    DailyAggregator::new(&config)
        .aggregate_directory(&cleaned_dir, &features_dir, &config, false, None)
        .unwrap();
    Concatenator::new(1)
        .concatenate_directory(&features_dir, &global_file, None)
        .await
        .unwrap();

    let builder = WindowFeatureBuilder::new(config.window_size);
    builder
        .build_global(&global_file, &output_file, &config, None)
        .unwrap();
    let first_run = fs::read_to_string(&output_file).unwrap();

    // A stale output file must be replaced, not appended to
    builder
        .build_global(&global_file, &output_file, &config, None)
        .unwrap();
    let second_run = fs::read_to_string(&output_file).unwrap();

    assert_eq!(first_run, second_run);
}

#[tokio::test]
async fn test_periods_concatenate_chronologically() {
    let temp_dir = TempDir::new().unwrap();
    let features_dir = temp_dir.path().join("features");
    let global_file = temp_dir.path().join("combined.csv");
    fs::create_dir_all(&features_dir).unwrap();

    // Later period written first; filename period keys must drive the order
    for (name, month) in [
        ("era5_full_dataset_2023_08_daily_features.csv", 8),
        ("era5_full_dataset_2023_07_daily_features.csv", 7),
    ] {
        let mut file = fs::File::create(features_dir.join(name)).unwrap();
        writeln!(file, "date,latitude,longitude,t2m_mean,t2m_mean_next").unwrap();
        writeln!(file, "2023-{:02}-01,10.0,20.0,18.0,19.0", month).unwrap();
    }

    Concatenator::new(2)
        .concatenate_directory(&features_dir, &global_file, None)
        .await
        .unwrap();

    let content = fs::read_to_string(&global_file).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert!(lines[1].starts_with("2023-07-01"));
    assert!(lines[2].starts_with("2023-08-01"));
}
