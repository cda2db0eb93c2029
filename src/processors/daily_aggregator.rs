use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::models::{DailyRecord, DailyTable, Location, LocationKey, ObservationTable};
use crate::processors::WindowFeatureBuilder;
use crate::readers::ObservationReader;
use crate::utils::constants::{CLEANED_SUFFIX, DAILY_STATS, EXCLUDED_VARIABLES, TARGET_SUFFIX};
use crate::utils::filename::{daily_features_filename, window_features_filename};
use crate::utils::progress::ProgressReporter;
use crate::writers::{ChunkedCsvWriter, DailyFeatureWriter};

/// Running min/max/sum over one (date, location, variable) group.
#[derive(Debug, Clone, Copy)]
struct StatAccumulator {
    min: f64,
    max: f64,
    sum: f64,
    count: usize,
}

impl StatAccumulator {
    fn new() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
            count: 0,
        }
    }

    fn push(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Per-file result counts from `aggregate_directory`.
#[derive(Debug, Clone)]
pub struct AggregateSummary {
    pub file: String,
    pub daily_rows: usize,
    pub window_rows: Option<usize>,
}

/// Stage 2: daily min/max/mean aggregation with next-day target generation.
///
/// Groups sub-daily observations by (date, location), reduces every tracked
/// variable to three statistics, then pairs each day's predicted-variable
/// stats with the same-location successor day. Days without a successor are
/// dropped entirely — the target-leakage gate, not an error.
pub struct DailyAggregator {
    predicted_variables: Vec<String>,
}

impl DailyAggregator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            predicted_variables: config.predicted_variables.clone(),
        }
    }

    pub fn with_predicted_variables(predicted_variables: Vec<String>) -> Self {
        Self {
            predicted_variables,
        }
    }

    /// Aggregate one cleaned observation table into a daily-feature table.
    pub fn aggregate(&self, table: &ObservationTable) -> DailyTable {
        let variables: Vec<(usize, String)> = table
            .variables
            .iter()
            .enumerate()
            .filter(|(_, name)| !EXCLUDED_VARIABLES.contains(&name.as_str()))
            .map(|(i, name)| (i, name.clone()))
            .collect();

        let feature_columns: Vec<String> = variables
            .iter()
            .flat_map(|(_, var)| DAILY_STATS.iter().map(move |stat| format!("{}_{}", var, stat)))
            .collect();

        // Group by (date, location), remembering first-seen group order
        let mut groups: HashMap<(NaiveDate, LocationKey), usize> = HashMap::new();
        let mut keys: Vec<(NaiveDate, Location)> = Vec::new();
        let mut accumulators: Vec<Vec<StatAccumulator>> = Vec::new();

        for row in &table.rows {
            let date = row.valid_time.date();
            let slot = *groups
                .entry((date, row.location.key()))
                .or_insert_with(|| {
                    keys.push((date, row.location));
                    accumulators.push(vec![StatAccumulator::new(); variables.len()]);
                    accumulators.len() - 1
                });
            for (v, (idx, _)) in variables.iter().enumerate() {
                if let Some(value) = row.values[*idx] {
                    accumulators[slot][v].push(value);
                }
            }
        }

        let mut daily = DailyTable::new(feature_columns, Vec::new());
        for ((date, location), stats) in keys.into_iter().zip(accumulators) {
            let mut features = Vec::with_capacity(variables.len() * DAILY_STATS.len());
            for acc in stats {
                features.push(acc.min);
                features.push(acc.max);
                features.push(acc.mean());
            }
            daily.records.push(DailyRecord {
                date,
                location,
                features,
                targets: Vec::new(),
            });
        }

        daily.sort_by_location_date();
        self.attach_targets(&mut daily);
        daily.records.retain(DailyRecord::has_complete_targets);
        daily
    }

    /// Pair each day's predicted-variable stats with the same-location
    /// successor record. Predicted variables absent from the input are
    /// skipped; the final day per location keeps null targets.
    fn attach_targets(&self, daily: &mut DailyTable) {
        let mut source_indices = Vec::new();
        let mut target_columns = Vec::new();

        for var in &self.predicted_variables {
            for stat in DAILY_STATS {
                let column = format!("{}_{}", var, stat);
                if let Some(idx) = daily.feature_index(&column) {
                    source_indices.push(idx);
                    target_columns.push(format!("{}{}", column, TARGET_SUFFIX));
                }
            }
        }
        daily.target_columns = target_columns;
        if source_indices.is_empty() {
            for record in &mut daily.records {
                record.targets = Vec::new();
            }
            return;
        }

        // Records are sorted by (location, date); the successor is simply the
        // next record when it belongs to the same location.
        for i in 0..daily.records.len() {
            let successor = daily.records.get(i + 1).and_then(|next| {
                (next.location.key() == daily.records[i].location.key())
                    .then(|| next.features.clone())
            });
            let targets = source_indices
                .iter()
                .map(|&idx| successor.as_ref().map(|f| f[idx]))
                .collect();
            daily.records[i].targets = targets;
        }
    }

    /// Run over every *_cleaned.csv in the input directory, writing
    /// `{base}_daily_features.csv` per file — and, when requested, the
    /// per-period window features through the canonical builder.
    pub fn aggregate_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        config: &PipelineConfig,
        with_window_features: bool,
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<AggregateSummary>> {
        let files = self.discover_cleaned_files(input_dir)?;
        if files.is_empty() {
            return Err(PipelineError::missing_input(
                input_dir,
                "no *_cleaned.csv files found; run the clean stage first",
            ));
        }
        std::fs::create_dir_all(output_dir)?;

        info!(files = files.len(), "aggregating cleaned extracts to daily features");

        let mut summaries = Vec::with_capacity(files.len());
        for input in &files {
            let file = input
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default();

            let mut table = ObservationReader::new().read(input)?;
            table.sort_by_location_time();
            let daily = self.aggregate(&table);

            let daily_path = output_dir.join(daily_features_filename(input));
            DailyFeatureWriter::new().write(&daily, &daily_path)?;
            debug!(file = %daily_path.display(), rows = daily.len(), "wrote daily features");

            let window_rows = if with_window_features {
                let builder = WindowFeatureBuilder::new(config.window_size);
                let schema = builder.schema_for(&daily);
                let window_path = output_dir.join(window_features_filename(input));
                let mut writer = ChunkedCsvWriter::new(
                    &window_path,
                    schema.header(),
                    config.chunk_save_size,
                )
                .with_narrow_floats(config.narrow_floats);

                for (location, series) in daily.clone().into_location_groups() {
                    writer.accumulate(builder.build(location, &series))?;
                }
                writer.flush()?;
                Some(writer.rows_written())
            } else {
                None
            };

            if let Some(p) = progress {
                p.increment(1);
            }
            summaries.push(AggregateSummary {
                file,
                daily_rows: daily.len(),
                window_rows,
            });
        }

        Ok(summaries)
    }

    fn discover_cleaned_files(&self, input_dir: &Path) -> Result<Vec<PathBuf>> {
        if !input_dir.is_dir() {
            return Err(PipelineError::missing_input(
                input_dir,
                "input directory does not exist; run the clean stage first",
            ));
        }
        let mut files: Vec<PathBuf> = std::fs::read_dir(input_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.file_stem()
                        .and_then(|s| s.to_str())
                        .map(|s| s.ends_with(CLEANED_SUFFIX))
                        .unwrap_or(false)
                    && p.extension().and_then(|e| e.to_str()) == Some("csv")
            })
            .collect();
        files.sort();
        Ok(files)
    }
}
