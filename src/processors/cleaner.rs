use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::models::ObservationTable;
use crate::readers::ObservationReader;
use crate::utils::constants::{RangePolicy, UNIT_CONVERSIONS, VALID_RANGES};
use crate::utils::filename::cleaned_filename;
use crate::utils::progress::ProgressReporter;
use crate::writers::ObservationWriter;

/// Per-file counts of every cleaning action. Data-quality findings are
/// reported, never raised.
#[derive(Debug, Clone, Default)]
pub struct CleaningReport {
    pub file: String,
    pub initial_rows: usize,
    pub final_rows: usize,
    pub converted_columns: Vec<String>,
    pub interpolated_values: usize,
    pub dropped_incomplete_rows: usize,
    /// (variable, rows removed) for Remove-policy ranges
    pub removed_rows: Vec<(String, usize)>,
    /// (variable, values clamped) for Clamp-policy ranges
    pub clamped_values: Vec<(String, usize)>,
}

impl CleaningReport {
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "{}: {} -> {} rows",
            self.file, self.initial_rows, self.final_rows
        )];
        if !self.converted_columns.is_empty() {
            lines.push(format!(
                "  units converted: {}",
                self.converted_columns.join(", ")
            ));
        }
        lines.push(format!(
            "  interpolated {} values, dropped {} incomplete rows",
            self.interpolated_values, self.dropped_incomplete_rows
        ));
        for (variable, count) in &self.removed_rows {
            lines.push(format!("  {}: {} out-of-range rows removed", variable, count));
        }
        for (variable, count) in &self.clamped_values {
            lines.push(format!("  {}: {} values clamped", variable, count));
        }
        lines.join("\n")
    }
}

/// Stage 1: per-month cleaning of raw ERA5 extracts.
///
/// Applies the fixed unit-conversion table, fills gaps by time-weighted
/// interpolation over the time-sorted rows, drops rows that remain
/// incomplete, then enforces the physical valid-range table.
pub struct Cleaner {
    max_workers: usize,
}

impl Cleaner {
    pub fn new() -> Self {
        Self {
            max_workers: num_cpus::get(),
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Clean every *.csv in the input directory, writing `{stem}_cleaned.csv`
    /// alongside a per-file report. Files are independent, so they run on a
    /// rayon pool.
    pub fn clean_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<CleaningReport>> {
        let files = self.discover_input_files(input_dir)?;
        if files.is_empty() {
            return Err(PipelineError::missing_input(
                input_dir,
                "no raw *.csv extracts found; place the per-month ERA5 files here",
            ));
        }
        std::fs::create_dir_all(output_dir)?;

        info!(files = files.len(), "cleaning raw extracts");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let reports: Result<Vec<CleaningReport>> = pool.install(|| {
            files
                .par_iter()
                .map(|input| {
                    let report = self.clean_file(input, output_dir);
                    if let Some(p) = progress {
                        p.increment(1);
                    }
                    report
                })
                .collect()
        });

        reports
    }

    /// Clean one raw file and write the result to the output directory.
    pub fn clean_file(&self, input: &Path, output_dir: &Path) -> Result<CleaningReport> {
        let table = ObservationReader::new().read(input)?;
        let file = input
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();

        let (cleaned, mut report) = self.clean_table(table);
        report.file = file;

        let output = output_dir.join(cleaned_filename(input));
        ObservationWriter::new().write(&cleaned, &output)?;
        debug!(file = %output.display(), rows = cleaned.len(), "wrote cleaned file");

        Ok(report)
    }

    /// The in-memory cleaning transform, separated from I/O for testing.
    pub fn clean_table(&self, mut table: ObservationTable) -> (ObservationTable, CleaningReport) {
        let mut report = CleaningReport {
            initial_rows: table.len(),
            ..Default::default()
        };

        table.sort_by_time();
        self.convert_units(&mut table, &mut report);
        report.interpolated_values = self.interpolate_gaps(&mut table);
        report.dropped_incomplete_rows = self.drop_incomplete(&mut table);
        self.enforce_ranges(&mut table, &mut report);

        report.final_rows = table.len();
        (table, report)
    }

    fn discover_input_files(&self, input_dir: &Path) -> Result<Vec<PathBuf>> {
        if !input_dir.is_dir() {
            return Err(PipelineError::missing_input(
                input_dir,
                "input directory does not exist",
            ));
        }
        let mut files: Vec<PathBuf> = std::fs::read_dir(input_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("csv"))
            .collect();
        files.sort();
        Ok(files)
    }

    fn convert_units(&self, table: &mut ObservationTable, report: &mut CleaningReport) {
        for conversion in UNIT_CONVERSIONS {
            // Skipped silently when the column is absent
            let Some(idx) = table.variable_index(conversion.variable) else {
                continue;
            };
            for row in &mut table.rows {
                if let Some(v) = row.values[idx] {
                    row.values[idx] = Some(v * conversion.scale + conversion.offset);
                }
            }
            report.converted_columns.push(conversion.variable.to_string());
        }
    }

    /// Time-weighted linear interpolation per variable column over the
    /// time-sorted rows; boundary gaps take the nearest valid value. Columns
    /// with no valid value at all are left missing.
    fn interpolate_gaps(&self, table: &mut ObservationTable) -> usize {
        let n = table.rows.len();
        let times: Vec<i64> = table
            .rows
            .iter()
            .map(|r| r.valid_time.and_utc().timestamp())
            .collect();

        let mut filled = 0usize;

        for col in 0..table.variables.len() {
            // Nearest valid neighbour on each side of every row
            let mut prev_valid: Vec<Option<usize>> = vec![None; n];
            let mut last = None;
            for i in 0..n {
                if table.rows[i].values[col].is_some() {
                    last = Some(i);
                }
                prev_valid[i] = last;
            }
            let mut next_valid: Vec<Option<usize>> = vec![None; n];
            let mut next = None;
            for i in (0..n).rev() {
                if table.rows[i].values[col].is_some() {
                    next = Some(i);
                }
                next_valid[i] = next;
            }

            for i in 0..n {
                if table.rows[i].values[col].is_some() {
                    continue;
                }
                let value = match (prev_valid[i], next_valid[i]) {
                    (Some(p), Some(q)) => {
                        let vp = table.rows[p].values[col].unwrap();
                        let vq = table.rows[q].values[col].unwrap();
                        let span = (times[q] - times[p]) as f64;
                        if span == 0.0 {
                            Some(vp)
                        } else {
                            let w = (times[i] - times[p]) as f64 / span;
                            Some(vp + w * (vq - vp))
                        }
                    }
                    (Some(p), None) => table.rows[p].values[col],
                    (None, Some(q)) => table.rows[q].values[col],
                    (None, None) => None,
                };
                if let Some(v) = value {
                    table.rows[i].values[col] = Some(v);
                    filled += 1;
                }
            }
        }

        filled
    }

    fn drop_incomplete(&self, table: &mut ObservationTable) -> usize {
        let before = table.len();
        table.rows.retain(|r| r.is_complete());
        before - table.len()
    }

    fn enforce_ranges(&self, table: &mut ObservationTable, report: &mut CleaningReport) {
        for range in VALID_RANGES {
            let Some(idx) = table.variable_index(range.variable) else {
                continue;
            };
            match range.policy {
                RangePolicy::Remove => {
                    let before = table.len();
                    table.rows.retain(|r| match r.values[idx] {
                        Some(v) => v >= range.min && v <= range.max,
                        None => true,
                    });
                    let removed = before - table.len();
                    if removed > 0 {
                        report.removed_rows.push((range.variable.to_string(), removed));
                    }
                }
                RangePolicy::Clamp => {
                    let mut clamped = 0usize;
                    for row in &mut table.rows {
                        if let Some(v) = row.values[idx] {
                            let bounded = v.clamp(range.min, range.max);
                            if bounded != v {
                                row.values[idx] = Some(bounded);
                                clamped += 1;
                            }
                        }
                    }
                    if clamped > 0 {
                        report.clamped_values.push((range.variable.to_string(), clamped));
                    }
                }
            }
        }
    }
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new()
    }
}
