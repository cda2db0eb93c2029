/// Identity column names shared by every stage boundary file
pub const VALID_TIME_COLUMN: &str = "valid_time";
pub const DATE_COLUMN: &str = "date";
pub const LATITUDE_COLUMN: &str = "latitude";
pub const LONGITUDE_COLUMN: &str = "longitude";

/// Daily statistic names, in output column order
pub const DAILY_STATS: [&str; 3] = ["min", "max", "mean"];

/// Suffix marking a next-day target column
pub const TARGET_SUFFIX: &str = "_next";

/// Suffixes for derived per-stage filenames
pub const CLEANED_SUFFIX: &str = "_cleaned";
pub const DAILY_FEATURES_SUFFIX: &str = "_daily_features";
pub const WINDOW_FEATURES_SUFFIX: &str = "_window_features";

/// Bookkeeping columns carried by ERA5 extracts but never aggregated
pub const EXCLUDED_VARIABLES: [&str; 2] = ["number", "expver"];

/// Variables for which next-day prediction targets are generated
pub const PREDICTED_VARIABLES: [&str; 1] = ["t2m"];

/// Processing defaults
pub const DEFAULT_WINDOW_SIZE: usize = 7;
pub const DEFAULT_CHUNK_SAVE_SIZE: usize = 10_000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
/// Locations handed to one rayon batch in the window stage
pub const LOCATION_BATCH_SIZE: usize = 64;

/// Additive/multiplicative unit conversion applied during cleaning
#[derive(Debug, Clone, Copy)]
pub struct UnitConversion {
    pub variable: &'static str,
    pub offset: f64,
    pub scale: f64,
}

/// Kelvin -> Celsius for dewpoint and skin temperature, Pa -> hPa for
/// mean sea-level pressure. 2m temperature arrives already in Celsius.
pub const UNIT_CONVERSIONS: [UnitConversion; 3] = [
    UnitConversion {
        variable: "d2m",
        offset: -273.15,
        scale: 1.0,
    },
    UnitConversion {
        variable: "skt",
        offset: -273.15,
        scale: 1.0,
    },
    UnitConversion {
        variable: "msl",
        offset: 0.0,
        scale: 1.0 / 100.0,
    },
];

/// What to do with a value outside its physical range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePolicy {
    /// Drop the whole row
    Remove,
    /// Clamp the value into range
    Clamp,
}

#[derive(Debug, Clone, Copy)]
pub struct ValidRange {
    pub variable: &'static str,
    pub min: f64,
    pub max: f64,
    pub policy: RangePolicy,
}

/// Physical sanity ranges, applied only when the column is present
pub const VALID_RANGES: [ValidRange; 7] = [
    ValidRange {
        variable: "t2m",
        min: -123.15,
        max: 57.0,
        policy: RangePolicy::Remove,
    },
    ValidRange {
        variable: "d2m",
        min: -123.15,
        max: 57.0,
        policy: RangePolicy::Remove,
    },
    ValidRange {
        variable: "skt",
        min: -123.15,
        max: 57.0,
        policy: RangePolicy::Remove,
    },
    ValidRange {
        variable: "tcc",
        min: 0.0,
        max: 1.0,
        policy: RangePolicy::Clamp,
    },
    ValidRange {
        variable: "tp",
        min: 0.0,
        max: f64::INFINITY,
        policy: RangePolicy::Clamp,
    },
    ValidRange {
        variable: "u10",
        min: -100.0,
        max: 100.0,
        policy: RangePolicy::Clamp,
    },
    ValidRange {
        variable: "v10",
        min: -100.0,
        max: 100.0,
        policy: RangePolicy::Clamp,
    },
];
