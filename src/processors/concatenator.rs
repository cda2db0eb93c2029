use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::models::DailyTable;
use crate::readers::ConcurrentReader;
use crate::utils::filename::{is_daily_features_file, period_key};
use crate::utils::progress::ProgressReporter;
use crate::writers::DailyFeatureWriter;

/// Stage 3: merge the per-period daily-feature tables into one continuous
/// global table.
///
/// Files are ordered by the YYYY_MM period embedded in their names (files
/// without one sort first), loaded concurrently, and re-sorted globally by
/// (location, date). Key uniqueness is guaranteed upstream and not
/// re-verified here.
pub struct Concatenator {
    max_workers: usize,
}

impl Concatenator {
    pub fn new(max_workers: usize) -> Self {
        Self { max_workers }
    }

    pub async fn concatenate_directory(
        &self,
        features_dir: &Path,
        output_file: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<usize> {
        let files = self.discover_daily_feature_files(features_dir)?;
        if files.is_empty() {
            return Err(PipelineError::missing_input(
                features_dir,
                "no *_daily_features.csv files found; run the aggregate stage first",
            ));
        }

        info!(files = files.len(), "concatenating per-period daily features");
        for file in &files {
            debug!(period = period_key(&file.to_string_lossy()), file = %file.display(), "queued");
        }

        if let Some(p) = progress {
            p.set_message(&format!("Loading {} period files...", files.len()));
        }
        let tables = ConcurrentReader::new(self.max_workers)
            .read_daily_feature_files(files.clone())
            .await?;

        let combined = self.concatenate(tables, &files)?;

        if let Some(p) = progress {
            p.set_message("Writing combined dataset...");
        }
        if let Some(parent) = output_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        DailyFeatureWriter::new().write(&combined, output_file)?;

        info!(rows = combined.len(), file = %output_file.display(), "wrote global daily-feature table");
        Ok(combined.len())
    }

    /// Merge already-ordered period tables and re-sort globally. All tables
    /// must share one schema.
    pub fn concatenate(&self, tables: Vec<DailyTable>, files: &[PathBuf]) -> Result<DailyTable> {
        let mut iter = tables.into_iter();
        let Some(mut combined) = iter.next() else {
            return Ok(DailyTable::default());
        };

        for (i, table) in iter.enumerate() {
            if table.feature_columns != combined.feature_columns
                || table.target_columns != combined.target_columns
            {
                let file = files
                    .get(i + 1)
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| format!("table {}", i + 1));
                return Err(PipelineError::InvalidFormat(format!(
                    "column schema of {} differs from the first period file",
                    file
                )));
            }
            combined.records.extend(table.records);
        }

        combined.sort_by_location_date();
        Ok(combined)
    }

    /// Daily-feature files in chronological period order.
    fn discover_daily_feature_files(&self, features_dir: &Path) -> Result<Vec<PathBuf>> {
        if !features_dir.is_dir() {
            return Err(PipelineError::missing_input(
                features_dir,
                "features directory does not exist; run the aggregate stage first",
            ));
        }
        let mut files: Vec<PathBuf> = std::fs::read_dir(features_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_daily_features_file(p))
            .collect();
        files.sort_by_key(|p| {
            let name = p
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default();
            (period_key(&name), name)
        });
        Ok(files)
    }
}

impl Default for Concatenator {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyRecord, Location};
    use chrono::{Datelike, NaiveDate};
    use std::io::Write;

    fn table(days: &[(f64, u32)]) -> DailyTable {
        let mut table = DailyTable::new(
            vec!["t2m_mean".to_string()],
            vec!["t2m_mean_next".to_string()],
        );
        for &(lat, day) in days {
            table.records.push(DailyRecord {
                date: NaiveDate::from_ymd_opt(2023, 7, day).unwrap(),
                location: Location::new(lat, 20.0),
                features: vec![day as f64],
                targets: vec![Some(day as f64 + 1.0)],
            });
        }
        table
    }

    #[test]
    fn test_concatenate_resorts_globally() {
        let a = table(&[(11.0, 1), (10.0, 2)]);
        let b = table(&[(10.0, 1)]);
        let combined = Concatenator::new(1).concatenate(vec![a, b], &[]).unwrap();

        let order: Vec<(f64, u32)> = combined
            .records
            .iter()
            .map(|r| (r.location.latitude, r.date.day()))
            .collect();
        assert_eq!(order, vec![(10.0, 1), (10.0, 2), (11.0, 1)]);
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let a = table(&[(10.0, 1)]);
        let mut b = table(&[(10.0, 2)]);
        b.feature_columns = vec!["tp_mean".to_string()];

        let err = Concatenator::new(1).concatenate(vec![a, b], &[]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidFormat(_)));
    }

    #[tokio::test]
    async fn test_directory_ordering_by_period() {
        let dir = tempfile::tempdir().unwrap();

        // Written out of chronological order on purpose
        for (name, day) in [
            ("era5_full_dataset_2023_08_daily_features.csv", 2),
            ("era5_full_dataset_2023_07_daily_features.csv", 1),
        ] {
            let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
            writeln!(file, "date,latitude,longitude,t2m_mean,t2m_mean_next").unwrap();
            writeln!(file, "2023-0{}-01,10.0,20.0,18.0,19.0", 6 + day).unwrap();
        }
        // Ignored: not a daily-features file
        std::fs::File::create(dir.path().join("notes.csv")).unwrap();

        let output = dir.path().join("combined.csv");
        let rows = Concatenator::new(2)
            .concatenate_directory(dir.path(), &output, None)
            .await
            .unwrap();

        assert_eq!(rows, 2);
        let content = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[1].starts_with("2023-07-01"));
        assert!(lines[2].starts_with("2023-08-01"));
    }

    #[tokio::test]
    async fn test_missing_inputs_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("combined.csv");

        let err = Concatenator::new(1)
            .concatenate_directory(dir.path(), &output, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput { .. }));
    }
}
