pub mod chunked_writer;
pub mod table_writer;

pub use chunked_writer::ChunkedCsvWriter;
pub use table_writer::{DailyFeatureWriter, ObservationWriter};

/// Render a float for CSV output, optionally narrowed to f32 storage width.
/// NaN renders as an empty field so readers see it as missing.
pub(crate) fn format_float(value: f64, narrow: bool) -> String {
    if value.is_nan() {
        return String::new();
    }
    if narrow {
        (value as f32).to_string()
    } else {
        value.to_string()
    }
}
