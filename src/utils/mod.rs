pub mod constants;
pub mod filename;
pub mod progress;

pub use constants::*;
pub use filename::{cleaned_filename, daily_features_filename, period_key};
pub use progress::ProgressReporter;
