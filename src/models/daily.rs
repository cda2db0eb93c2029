use chrono::NaiveDate;
use std::collections::HashMap;

use crate::models::{Location, LocationKey};
use crate::utils::constants::{DATE_COLUMN, LATITUDE_COLUMN, LONGITUDE_COLUMN};

/// One (location, date) row after daily aggregation. `features` is aligned
/// to the table's `feature_columns`, `targets` to `target_columns`; a `None`
/// target marks a day with no same-location successor.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub location: Location,
    pub features: Vec<f64>,
    pub targets: Vec<Option<f64>>,
}

impl DailyRecord {
    pub fn has_complete_targets(&self) -> bool {
        self.targets.iter().all(Option::is_some)
    }
}

/// Daily-feature table for one period, or the concatenated global series.
#[derive(Debug, Clone, Default)]
pub struct DailyTable {
    pub feature_columns: Vec<String>,
    pub target_columns: Vec<String>,
    pub records: Vec<DailyRecord>,
}

impl DailyTable {
    pub fn new(feature_columns: Vec<String>, target_columns: Vec<String>) -> Self {
        Self {
            feature_columns,
            target_columns,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.feature_columns.iter().position(|c| c == name)
    }

    /// Full output header: identity columns, features, then targets.
    pub fn header(&self) -> Vec<String> {
        let mut columns = vec![
            DATE_COLUMN.to_string(),
            LATITUDE_COLUMN.to_string(),
            LONGITUDE_COLUMN.to_string(),
        ];
        columns.extend(self.feature_columns.iter().cloned());
        columns.extend(self.target_columns.iter().cloned());
        columns
    }

    /// Global sort by (latitude, longitude, date).
    pub fn sort_by_location_date(&mut self) {
        self.records.sort_by(|a, b| {
            a.location
                .cmp_coordinates(&b.location)
                .then_with(|| a.date.cmp(&b.date))
        });
    }

    /// Split into per-location series in first-seen row order, each series
    /// sorted ascending by date. Grid cells never share a key, so bit-exact
    /// grouping is lossless.
    pub fn into_location_groups(self) -> Vec<(Location, Vec<DailyRecord>)> {
        let mut index: HashMap<LocationKey, usize> = HashMap::new();
        let mut groups: Vec<(Location, Vec<DailyRecord>)> = Vec::new();

        for record in self.records {
            let key = record.location.key();
            match index.get(&key) {
                Some(&slot) => groups[slot].1.push(record),
                None => {
                    index.insert(key, groups.len());
                    groups.push((record.location, vec![record]));
                }
            }
        }

        for (_, series) in groups.iter_mut() {
            series.sort_by_key(|r| r.date);
        }

        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 7, d).unwrap()
    }

    fn record(lat: f64, lon: f64, d: u32, value: f64) -> DailyRecord {
        DailyRecord {
            date: day(d),
            location: Location::new(lat, lon),
            features: vec![value],
            targets: vec![Some(value + 1.0)],
        }
    }

    #[test]
    fn test_header_layout() {
        let table = DailyTable::new(
            vec!["t2m_min".to_string(), "t2m_max".to_string()],
            vec!["t2m_mean_next".to_string()],
        );
        assert_eq!(
            table.header(),
            vec!["date", "latitude", "longitude", "t2m_min", "t2m_max", "t2m_mean_next"]
        );
    }

    #[test]
    fn test_sort_by_location_date() {
        let mut table = DailyTable::default();
        table.records = vec![
            record(11.0, 20.0, 1, 0.0),
            record(10.0, 20.0, 2, 1.0),
            record(10.0, 20.0, 1, 2.0),
        ];
        table.sort_by_location_date();
        assert_eq!(table.records[0].location.latitude, 10.0);
        assert_eq!(table.records[0].date, day(1));
        assert_eq!(table.records[1].date, day(2));
        assert_eq!(table.records[2].location.latitude, 11.0);
    }

    #[test]
    fn test_group_preserves_first_seen_order() {
        let mut table = DailyTable::default();
        // Second location appears first in row order
        table.records = vec![
            record(11.0, 20.0, 2, 0.0),
            record(10.0, 20.0, 1, 1.0),
            record(11.0, 20.0, 1, 2.0),
        ];
        let groups = table.into_location_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, Location::new(11.0, 20.0));
        // Series sorted by date within the group
        assert_eq!(groups[0].1[0].date, day(1));
        assert_eq!(groups[0].1[1].date, day(2));
        assert_eq!(groups[1].0, Location::new(10.0, 20.0));
    }

    #[test]
    fn test_complete_targets() {
        let mut r = record(10.0, 20.0, 1, 5.0);
        assert!(r.has_complete_targets());
        r.targets = vec![None];
        assert!(!r.has_complete_targets());
    }
}
