pub mod concurrent_reader;
pub mod daily_reader;
pub mod observation_reader;

pub use concurrent_reader::ConcurrentReader;
pub use daily_reader::DailyFeatureReader;
pub use observation_reader::ObservationReader;
