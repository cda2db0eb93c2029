use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::models::{DailyRecord, DailyTable, Location, WindowFeatureRow, WindowSchema, WindowStats};
use crate::readers::DailyFeatureReader;
use crate::utils::constants::LOCATION_BATCH_SIZE;
use crate::utils::progress::ProgressReporter;
use crate::writers::ChunkedCsvWriter;

/// Run counts from `build_global`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowRunSummary {
    pub locations: usize,
    pub short_series: usize,
    pub rows_written: usize,
}

/// Stage 4: fixed-width rolling-window feature construction.
///
/// For every eligible (location, date) pair this computes the summary
/// statistics over the `window_size` daily records *strictly preceding* the
/// target day — by sequence position, not calendar distance — and attaches
/// that day's target values unchanged. A row is emitted only when the full
/// window exists and every target is present, so no output row can leak its
/// own day into the features or carry an undefined label.
pub struct WindowFeatureBuilder {
    window_size: usize,
}

impl WindowFeatureBuilder {
    pub fn new(window_size: usize) -> Self {
        Self { window_size }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Output schema for a daily table processed at this window size.
    pub fn schema_for(&self, table: &DailyTable) -> WindowSchema {
        WindowSchema::new(
            table.feature_columns.clone(),
            table.target_columns.clone(),
            self.window_size,
        )
    }

    /// Build feature rows for one location's date-sorted series.
    ///
    /// A series of length N yields max(0, N - W) candidate rows; candidates
    /// with any missing target are silently skipped.
    pub fn build(&self, location: Location, series: &[DailyRecord]) -> Vec<WindowFeatureRow> {
        let w = self.window_size;
        if series.len() <= w {
            debug!(%location, days = series.len(), "series shorter than window, skipped");
            return Vec::new();
        }

        let n_features = series[0].features.len();
        let include_recent = w >= crate::models::window::RECENT_DAYS;
        let stats_per_feature = crate::models::window::WINDOW_STAT_NAMES.len()
            + usize::from(include_recent);

        let mut rows = Vec::with_capacity(series.len() - w);
        let mut column_values = vec![0.0f64; w];

        for i in w..series.len() {
            let target_row = &series[i];

            // Leakage gate: a row with any undefined label is not a sample
            if !target_row.has_complete_targets() {
                continue;
            }

            let window = &series[i - w..i];
            let mut features = Vec::with_capacity(n_features * stats_per_feature);
            for col in 0..n_features {
                for (slot, record) in column_values.iter_mut().zip(window) {
                    *slot = record.features[col];
                }
                let stats = WindowStats::compute(&column_values);
                features.extend(stats.into_values(include_recent));
            }

            let targets = target_row.targets.iter().map(|t| t.unwrap_or(f64::NAN)).collect();

            rows.push(WindowFeatureRow {
                date: target_row.date,
                location,
                features,
                targets,
            });
        }

        rows
    }

    /// Stage-4 entry point: window the concatenated global daily table into
    /// the final model-ready CSV with bounded memory.
    ///
    /// Locations are processed in first-seen order; batches of locations are
    /// built in parallel and drained in order through a single serializing
    /// `ChunkedCsvWriter`.
    pub fn build_global(
        &self,
        input_file: &Path,
        output_file: &Path,
        config: &PipelineConfig,
        progress: Option<&ProgressReporter>,
    ) -> Result<WindowRunSummary> {
        if !input_file.is_file() {
            return Err(PipelineError::missing_input(
                input_file,
                "global daily-feature table not found; run the concat stage first",
            ));
        }

        let table = DailyFeatureReader::with_mmap(true).read(input_file)?;
        info!(
            rows = table.len(),
            features = table.feature_columns.len(),
            targets = table.target_columns.len(),
            "loaded global daily-feature table"
        );

        let schema = self.schema_for(&table);
        let groups = table.into_location_groups();
        let mut summary = WindowRunSummary {
            locations: groups.len(),
            ..Default::default()
        };

        // A partial file from an aborted run is invalid by contract
        if output_file.exists() {
            std::fs::remove_file(output_file)?;
        }

        let mut writer = ChunkedCsvWriter::new(output_file, schema.header(), config.chunk_save_size)
            .with_narrow_floats(config.narrow_floats);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_workers)
            .build()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        for batch in groups.chunks(LOCATION_BATCH_SIZE) {
            let built: Vec<Vec<WindowFeatureRow>> = pool.install(|| {
                batch
                    .par_iter()
                    .map(|(location, series)| self.build(*location, series))
                    .collect()
            });

            for rows in built {
                if rows.is_empty() {
                    summary.short_series += 1;
                }
                writer.accumulate(rows)?;
            }
            if let Some(p) = progress {
                p.increment(batch.len() as u64);
            }
        }

        writer.flush()?;
        summary.rows_written = writer.rows_written();

        info!(
            locations = summary.locations,
            short_series = summary.short_series,
            rows = summary.rows_written,
            "window feature build complete"
        );
        Ok(summary)
    }
}
