pub mod daily;
pub mod location;
pub mod observation;
pub mod window;

pub use daily::{DailyRecord, DailyTable};
pub use location::{Location, LocationKey};
pub use observation::{Observation, ObservationTable};
pub use window::{WindowFeatureRow, WindowSchema, WindowStats};
