use chrono::NaiveDateTime;

use crate::models::Location;

/// One raw (or cleaned) hourly measurement row. `values` is aligned to the
/// owning table's `variables`; `None` marks a missing measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub valid_time: NaiveDateTime,
    pub location: Location,
    pub values: Vec<Option<f64>>,
}

impl Observation {
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }
}

/// In-memory table of sub-daily observations for one period file.
///
/// Identity columns (valid_time, latitude, longitude) are carried on the
/// rows; every other input column is a variable column listed here in file
/// order.
#[derive(Debug, Clone, Default)]
pub struct ObservationTable {
    pub variables: Vec<String>,
    pub rows: Vec<Observation>,
}

impl ObservationTable {
    pub fn new(variables: Vec<String>) -> Self {
        Self {
            variables,
            rows: Vec::new(),
        }
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stable ascending sort by wall-clock time.
    pub fn sort_by_time(&mut self) {
        self.rows.sort_by_key(|r| r.valid_time);
    }

    /// Stable sort by (longitude, latitude, valid_time), the row order the
    /// aggregation stage expects on load.
    pub fn sort_by_location_time(&mut self) {
        self.rows.sort_by(|a, b| {
            a.location
                .longitude
                .total_cmp(&b.location.longitude)
                .then_with(|| a.location.latitude.total_cmp(&b.location.latitude))
                .then_with(|| a.valid_time.cmp(&b.valid_time))
        });
    }
}
