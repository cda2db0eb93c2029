use chrono::NaiveDate;
use memmap2::Mmap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::models::{DailyRecord, DailyTable, Location};
use crate::utils::constants::{
    DATE_COLUMN, DEFAULT_BUFFER_SIZE, LATITUDE_COLUMN, LONGITUDE_COLUMN, TARGET_SUFFIX,
};

/// Reader for daily-feature tables (per-period or the concatenated global
/// file). Columns ending `_next` are targets; everything else besides the
/// identity columns is a feature.
pub struct DailyFeatureReader {
    use_mmap: bool,
}

impl DailyFeatureReader {
    pub fn new() -> Self {
        Self { use_mmap: false }
    }

    /// Memory-map the input instead of buffered reads. Worth it for the
    /// multi-million-row global table.
    pub fn with_mmap(use_mmap: bool) -> Self {
        Self { use_mmap }
    }

    pub fn read(&self, path: &Path) -> Result<DailyTable> {
        if self.use_mmap {
            let file = File::open(path)?;
            let mmap = unsafe { Mmap::map(&file)? };
            self.read_from(csv::Reader::from_reader(&mmap[..]), path)
        } else {
            let file = File::open(path)?;
            let reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);
            self.read_from(csv::Reader::from_reader(reader), path)
        }
    }

    fn read_from<R: std::io::Read>(
        &self,
        mut csv_reader: csv::Reader<R>,
        path: &Path,
    ) -> Result<DailyTable> {
        let context = path.display().to_string();
        let headers = csv_reader.headers()?.clone();

        let date_idx = column_index(&headers, DATE_COLUMN, &context)?;
        let lat_idx = column_index(&headers, LATITUDE_COLUMN, &context)?;
        let lon_idx = column_index(&headers, LONGITUDE_COLUMN, &context)?;
        let identity = [date_idx, lat_idx, lon_idx];

        let mut feature_indices = Vec::new();
        let mut feature_columns = Vec::new();
        let mut target_indices = Vec::new();
        let mut target_columns = Vec::new();

        for (i, name) in headers.iter().enumerate() {
            if identity.contains(&i) {
                continue;
            }
            if name.ends_with(TARGET_SUFFIX) {
                target_indices.push(i);
                target_columns.push(name.to_string());
            } else {
                feature_indices.push(i);
                feature_columns.push(name.to_string());
            }
        }

        let mut table = DailyTable::new(feature_columns, target_columns);

        for record in csv_reader.records() {
            let record = record?;

            let date = NaiveDate::parse_from_str(record[date_idx].trim(), "%Y-%m-%d")?;
            let latitude = parse_float(&record[lat_idx], LATITUDE_COLUMN, &context)?;
            let longitude = parse_float(&record[lon_idx], LONGITUDE_COLUMN, &context)?;

            let features = feature_indices
                .iter()
                .map(|&i| parse_float(&record[i], &headers[i], &context))
                .collect::<Result<Vec<f64>>>()?;

            let targets = target_indices
                .iter()
                .map(|&i| parse_optional(&record[i]))
                .collect();

            table.records.push(DailyRecord {
                date,
                location: Location::new(latitude, longitude),
                features,
                targets,
            });
        }

        Ok(table)
    }
}

impl Default for DailyFeatureReader {
    fn default() -> Self {
        Self::new()
    }
}

fn column_index(headers: &csv::StringRecord, name: &str, context: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| PipelineError::missing_column(name, context))
}

fn parse_float(s: &str, column: &str, context: &str) -> Result<f64> {
    s.trim().parse::<f64>().map_err(|_| {
        PipelineError::InvalidFormat(format!("Invalid {} value '{}' in {}", column, s, context))
    })
}

fn parse_optional(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_nan() => None,
        Ok(v) => Some(v),
        Err(_) => None,
    }
}
