pub mod cleaner;
pub mod concatenator;
pub mod daily_aggregator;
pub mod window_builder;

pub use cleaner::{Cleaner, CleaningReport};
pub use concatenator::Concatenator;
pub use daily_aggregator::{AggregateSummary, DailyAggregator};
pub use window_builder::{WindowFeatureBuilder, WindowRunSummary};
