use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use validator::Validate;

/// Bit-exact grouping key for a grid cell. ERA5 grid coordinates are fixed
/// values repeated verbatim on every row, so comparing the raw bits is safe.
pub type LocationKey = (u64, u64);

/// A fixed (latitude, longitude) grid cell identifying one time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Location {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn key(&self) -> LocationKey {
        (self.latitude.to_bits(), self.longitude.to_bits())
    }

    /// Total order by (latitude, longitude), used for global sorts.
    pub fn cmp_coordinates(&self, other: &Self) -> Ordering {
        self.latitude
            .total_cmp(&other.latitude)
            .then_with(|| self.longitude.total_cmp(&other.longitude))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}
