use chrono::NaiveDate;

use crate::models::Location;
use crate::utils::constants::{DATE_COLUMN, LATITUDE_COLUMN, LONGITUDE_COLUMN};

/// Statistic names appended to each feature column, in output order.
pub const WINDOW_STAT_NAMES: [&str; 7] = ["mean", "std", "min", "max", "first", "last", "trend"];

/// Trailing-mean statistic, only defined for windows of at least 3 days.
pub const RECENT_STAT_NAME: &str = "recent_3d";
pub const RECENT_DAYS: usize = 3;

/// Summary statistics over one window of values.
///
/// `std` is the population standard deviation (divide by N, not N-1);
/// `first`/`last` are the oldest/newest values by position; `trend` is the
/// signed difference `last - first`. `recent_3d` is absent, not null, when
/// the window holds fewer than 3 values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub first: f64,
    pub last: f64,
    pub trend: f64,
    pub recent_3d: Option<f64>,
}

impl WindowStats {
    /// Compute all statistics over a non-empty window of values, oldest
    /// first.
    pub fn compute(values: &[f64]) -> Self {
        debug_assert!(!values.is_empty());
        let n = values.len() as f64;

        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in values {
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        let mean = sum / n;

        let variance = values.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n;

        let first = values[0];
        let last = values[values.len() - 1];

        let recent_3d = if values.len() >= RECENT_DAYS {
            let tail = &values[values.len() - RECENT_DAYS..];
            Some(tail.iter().sum::<f64>() / RECENT_DAYS as f64)
        } else {
            None
        };

        Self {
            mean,
            std: variance.sqrt(),
            min,
            max,
            first,
            last,
            trend: last - first,
            recent_3d,
        }
    }

    /// Flatten into output order, matching `WindowSchema::stat_columns`.
    pub fn into_values(self, include_recent: bool) -> Vec<f64> {
        let mut out = vec![
            self.mean, self.std, self.min, self.max, self.first, self.last, self.trend,
        ];
        if include_recent {
            // Guarded by the schema: include_recent implies window >= 3
            out.push(self.recent_3d.unwrap_or(f64::NAN));
        }
        out
    }
}

/// Column layout of the window-feature output table.
#[derive(Debug, Clone)]
pub struct WindowSchema {
    pub feature_columns: Vec<String>,
    pub target_columns: Vec<String>,
    /// Whether recent_3d is emitted (window size >= 3).
    pub include_recent: bool,
}

impl WindowSchema {
    pub fn new(
        feature_columns: Vec<String>,
        target_columns: Vec<String>,
        window_size: usize,
    ) -> Self {
        Self {
            feature_columns,
            target_columns,
            include_recent: window_size >= RECENT_DAYS,
        }
    }

    pub fn stats_per_feature(&self) -> usize {
        WINDOW_STAT_NAMES.len() + usize::from(self.include_recent)
    }

    /// Derived statistic columns for every feature, in output order.
    pub fn stat_columns(&self) -> Vec<String> {
        let mut columns = Vec::with_capacity(self.feature_columns.len() * self.stats_per_feature());
        for col in &self.feature_columns {
            for stat in WINDOW_STAT_NAMES {
                columns.push(format!("{}_{}", col, stat));
            }
            if self.include_recent {
                columns.push(format!("{}_{}", col, RECENT_STAT_NAME));
            }
        }
        columns
    }

    /// Full output header: identity columns, derived statistics, targets.
    pub fn header(&self) -> Vec<String> {
        let mut columns = vec![
            DATE_COLUMN.to_string(),
            LATITUDE_COLUMN.to_string(),
            LONGITUDE_COLUMN.to_string(),
        ];
        columns.extend(self.stat_columns());
        columns.extend(self.target_columns.iter().cloned());
        columns
    }
}

/// One model-ready output row: all window statistics for the day being
/// predicted, plus that day's target values copied through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowFeatureRow {
    pub date: NaiveDate,
    pub location: Location,
    pub features: Vec<f64>,
    pub targets: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stats_basic() {
        let stats = WindowStats::compute(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.first, 1.0);
        assert_eq!(stats.last, 4.0);
        assert_eq!(stats.trend, 3.0);
        // Population variance of [1,2,3,4] is 1.25
        assert!((stats.std - 1.25_f64.sqrt()).abs() < 1e-12);
        assert_eq!(stats.recent_3d, Some(3.0));
    }

    #[test]
    fn test_recent_absent_for_short_windows() {
        let stats = WindowStats::compute(&[5.0, 7.0]);
        assert_eq!(stats.recent_3d, None);
    }

    #[test]
    fn test_population_std_of_constant_window() {
        let stats = WindowStats::compute(&[3.0; 7]);
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.trend, 0.0);
    }

    #[test]
    fn test_schema_columns() {
        let schema = WindowSchema::new(
            vec!["t2m_mean".to_string()],
            vec!["t2m_mean_next".to_string()],
            7,
        );
        assert_eq!(schema.stats_per_feature(), 8);
        assert_eq!(
            schema.stat_columns(),
            vec![
                "t2m_mean_mean",
                "t2m_mean_std",
                "t2m_mean_min",
                "t2m_mean_max",
                "t2m_mean_first",
                "t2m_mean_last",
                "t2m_mean_trend",
                "t2m_mean_recent_3d",
            ]
        );
        assert_eq!(schema.header()[..3], ["date", "latitude", "longitude"]);
    }

    #[test]
    fn test_schema_omits_recent_below_three() {
        let schema = WindowSchema::new(vec!["tp_mean".to_string()], vec![], 2);
        assert_eq!(schema.stats_per_feature(), 7);
        assert!(!schema.stat_columns().iter().any(|c| c.contains("recent")));
    }
}
