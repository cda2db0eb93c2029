use chrono::NaiveDateTime;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use validator::Validate;

use crate::error::{PipelineError, Result};
use crate::models::{Location, Observation, ObservationTable};
use crate::utils::constants::{
    DEFAULT_BUFFER_SIZE, LATITUDE_COLUMN, LONGITUDE_COLUMN, VALID_TIME_COLUMN,
};

/// Reader for raw and cleaned per-month ERA5 extracts.
///
/// Identity columns (valid_time, latitude, longitude) are required; every
/// other column becomes a variable column in file order. Empty and NaN
/// fields are kept as missing values for the cleaner to fill.
pub struct ObservationReader;

impl ObservationReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&self, path: &Path) -> Result<ObservationTable> {
        let file = File::open(path)?;
        let reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);
        let mut csv_reader = csv::Reader::from_reader(reader);

        let context = path.display().to_string();
        let headers = csv_reader.headers()?.clone();

        let time_idx = column_index(&headers, VALID_TIME_COLUMN, &context)?;
        let lat_idx = column_index(&headers, LATITUDE_COLUMN, &context)?;
        let lon_idx = column_index(&headers, LONGITUDE_COLUMN, &context)?;
        let identity = [time_idx, lat_idx, lon_idx];

        let variable_indices: Vec<usize> = (0..headers.len())
            .filter(|i| !identity.contains(i))
            .collect();
        let variables: Vec<String> = variable_indices
            .iter()
            .map(|&i| headers[i].to_string())
            .collect();

        let mut table = ObservationTable::new(variables);

        for record in csv_reader.records() {
            let record = record?;

            let valid_time = parse_timestamp(&record[time_idx])?;
            let latitude = parse_required_float(&record[lat_idx], LATITUDE_COLUMN, &context)?;
            let longitude = parse_required_float(&record[lon_idx], LONGITUDE_COLUMN, &context)?;

            let location = Location::new(latitude, longitude);
            location.validate()?;

            let values = variable_indices
                .iter()
                .map(|&i| parse_optional_float(&record[i]))
                .collect();

            table.rows.push(Observation {
                valid_time,
                location,
                values,
            });
        }

        Ok(table)
    }
}

impl Default for ObservationReader {
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

/// Accept both `2023-07-01 12:00:00` and ISO `2023-07-01T12:00:00` forms.
fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(PipelineError::from)
}

fn parse_required_float(s: &str, column: &str, context: &str) -> Result<f64> {
    s.trim().parse::<f64>().map_err(|_| {
        PipelineError::InvalidFormat(format!("Invalid {} value '{}' in {}", column, s, context))
    })
}

/// Missing data policy: empty fields and NaN both count as absent.
fn parse_optional_float(s: &str) -> Option<f64> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_read_basic_file() {
        let file = write_csv(
            "valid_time,latitude,longitude,t2m,tp\n\
             2023-07-01 00:00:00,10.0,20.0,15.5,0.0\n\
             2023-07-01 01:00:00,10.0,20.0,,0.1\n",
        );

        let table = ObservationReader::new().read(file.path()).unwrap();
        assert_eq!(table.variables, vec!["t2m", "tp"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].values, vec![Some(15.5), Some(0.0)]);
        assert_eq!(table.rows[1].values, vec![None, Some(0.1)]);
        assert_eq!(table.rows[0].location, Location::new(10.0, 20.0));
    }

    #[test]
    fn test_nan_treated_as_missing() {
        let file = write_csv(
            "valid_time,latitude,longitude,t2m\n\
             2023-07-01T00:00:00,10.0,20.0,NaN\n",
        );
        let table = ObservationReader::new().read(file.path()).unwrap();
        assert_eq!(table.rows[0].values, vec![None]);
    }

    #[test]
    fn test_missing_key_column_is_fatal() {
        let file = write_csv("valid_time,latitude,t2m\n2023-07-01 00:00:00,10.0,15.5\n");
        let err = ObservationReader::new().read(file.path()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { ref column, .. } if column == "longitude"));
    }

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        let file = write_csv(
            "valid_time,latitude,longitude,t2m\n\
             2023-07-01 00:00:00,95.0,20.0,15.5\n",
        );
        assert!(ObservationReader::new().read(file.path()).is_err());
    }
}
