use std::fs::File;
use std::path::Path;

use crate::error::Result;
use crate::models::{DailyTable, ObservationTable};
use crate::utils::constants::{LATITUDE_COLUMN, LONGITUDE_COLUMN, VALID_TIME_COLUMN};
use crate::writers::format_float;

/// Writes cleaned observation tables back out with the input schema.
pub struct ObservationWriter;

impl ObservationWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write(&self, table: &ObservationTable, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_writer(File::create(path)?);

        let mut header = vec![
            VALID_TIME_COLUMN.to_string(),
            LATITUDE_COLUMN.to_string(),
            LONGITUDE_COLUMN.to_string(),
        ];
        header.extend(table.variables.iter().cloned());
        writer.write_record(&header)?;

        for row in &table.rows {
            let mut record = csv::StringRecord::with_capacity(64, header.len());
            record.push_field(&row.valid_time.format("%Y-%m-%d %H:%M:%S").to_string());
            record.push_field(&format_float(row.location.latitude, false));
            record.push_field(&format_float(row.location.longitude, false));
            for value in &row.values {
                match value {
                    Some(v) => record.push_field(&format_float(*v, false)),
                    None => record.push_field(""),
                }
            }
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl Default for ObservationWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes daily-feature tables (per-period and concatenated global).
pub struct DailyFeatureWriter;

impl DailyFeatureWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write(&self, table: &DailyTable, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_writer(File::create(path)?);

        let header = table.header();
        writer.write_record(&header)?;

        for record in &table.records {
            let mut row = csv::StringRecord::with_capacity(64, header.len());
            row.push_field(&record.date.to_string());
            row.push_field(&format_float(record.location.latitude, false));
            row.push_field(&format_float(record.location.longitude, false));
            for value in &record.features {
                row.push_field(&format_float(*value, false));
            }
            for target in &record.targets {
                match target {
                    Some(v) => row.push_field(&format_float(*v, false)),
                    None => row.push_field(""),
                }
            }
            writer.write_record(&row)?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl Default for DailyFeatureWriter {
    fn default() -> Self {
        Self::new()
    }
}
