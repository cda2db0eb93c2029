use std::path::{Path, PathBuf};

use crate::utils::constants::{CLEANED_SUFFIX, DAILY_FEATURES_SUFFIX, WINDOW_FEATURES_SUFFIX};

/// Extract the YYYYMM period key embedded in a per-month filename
/// (e.g. era5_full_dataset_2023_07_daily_features.csv -> 202307).
///
/// Files without a recognisable `YYYY_MM` group get key 0 and therefore
/// sort ahead of every dated file.
pub fn period_key(filename: &str) -> u32 {
    let bytes = filename.as_bytes();

    for start in 0..bytes.len() {
        // candidate must not continue a longer digit run
        if start > 0 && bytes[start - 1].is_ascii_digit() {
            continue;
        }
        let Some(window) = bytes.get(start..start + 7) else {
            break;
        };
        let year_ok = window[..4].iter().all(u8::is_ascii_digit);
        let month_ok = window[4] == b'_' && window[5..7].iter().all(u8::is_ascii_digit);
        let terminated = bytes
            .get(start + 7)
            .map(|b| !b.is_ascii_digit())
            .unwrap_or(true);

        if year_ok && month_ok && terminated {
            let year: u32 = filename[start..start + 4].parse().unwrap_or(0);
            let month: u32 = filename[start + 5..start + 7].parse().unwrap_or(0);
            return year * 100 + month;
        }
    }

    0
}

fn with_stem_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    PathBuf::from(format!("{}{}.csv", stem, suffix))
}

/// era5_full_dataset_2023_07.csv -> era5_full_dataset_2023_07_cleaned.csv
pub fn cleaned_filename(input: &Path) -> PathBuf {
    with_stem_suffix(input, CLEANED_SUFFIX)
}

/// era5_full_dataset_2023_07_cleaned.csv -> era5_full_dataset_2023_07_daily_features.csv
pub fn daily_features_filename(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let base = stem.strip_suffix(CLEANED_SUFFIX).unwrap_or(stem);
    PathBuf::from(format!("{}{}.csv", base, DAILY_FEATURES_SUFFIX))
}

/// era5_full_dataset_2023_07_cleaned.csv -> era5_full_dataset_2023_07_window_features.csv
pub fn window_features_filename(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let base = stem.strip_suffix(CLEANED_SUFFIX).unwrap_or(stem);
    PathBuf::from(format!("{}{}.csv", base, WINDOW_FEATURES_SUFFIX))
}

/// True for files produced by the aggregation stage.
pub fn is_daily_features_file(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.ends_with(DAILY_FEATURES_SUFFIX))
        .unwrap_or(false)
        && path.extension().and_then(|e| e.to_str()) == Some("csv")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_key_from_monthly_filename() {
        assert_eq!(
            period_key("era5_full_dataset_2023_07_daily_features.csv"),
            202307
        );
        assert_eq!(period_key("era5_full_dataset_2019_12.csv"), 201912);
    }

    #[test]
    fn test_period_key_fallback() {
        // No YYYY_MM group sorts first
        assert_eq!(period_key("era5_combined.csv"), 0);
        assert_eq!(period_key("daily_features.csv"), 0);
    }

    #[test]
    fn test_period_key_ignores_longer_digit_runs() {
        // 5-digit run is not a year
        assert_eq!(period_key("era5_12345_67_data.csv"), 0);
    }

    #[test]
    fn test_derived_filenames() {
        let raw = Path::new("era5_full_dataset_2023_07.csv");
        assert_eq!(
            cleaned_filename(raw),
            PathBuf::from("era5_full_dataset_2023_07_cleaned.csv")
        );

        let cleaned = Path::new("era5_full_dataset_2023_07_cleaned.csv");
        assert_eq!(
            daily_features_filename(cleaned),
            PathBuf::from("era5_full_dataset_2023_07_daily_features.csv")
        );
        assert_eq!(
            window_features_filename(cleaned),
            PathBuf::from("era5_full_dataset_2023_07_window_features.csv")
        );
    }

    #[test]
    fn test_is_daily_features_file() {
        assert!(is_daily_features_file(Path::new(
            "era5_full_dataset_2023_07_daily_features.csv"
        )));
        assert!(!is_daily_features_file(Path::new(
            "era5_full_dataset_2023_07_window_features.csv"
        )));
        assert!(!is_daily_features_file(Path::new("notes.txt")));
    }
}
