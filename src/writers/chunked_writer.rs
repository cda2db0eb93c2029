use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;
use crate::models::WindowFeatureRow;
use crate::writers::format_float;

/// Append-only CSV sink with bounded buffering.
///
/// Batches accumulate in memory; once the buffer reaches `chunk_size` rows it
/// is appended to the output file and cleared. The header is written exactly
/// once, on the first flush. Rows are never reordered or duplicated, so the
/// persisted row count always equals the sum of accumulated batch sizes.
///
/// Single-writer by construction: the file handle is owned here and parallel
/// producers must drain through one instance.
pub struct ChunkedCsvWriter {
    path: PathBuf,
    columns: Vec<String>,
    chunk_size: usize,
    narrow_floats: bool,
    writer: Option<csv::Writer<File>>,
    buffer: Vec<WindowFeatureRow>,
    rows_written: usize,
}

impl ChunkedCsvWriter {
    pub fn new(path: &Path, columns: Vec<String>, chunk_size: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            columns,
            chunk_size,
            narrow_floats: true,
            writer: None,
            buffer: Vec::new(),
            rows_written: 0,
        }
    }

    /// Set whether values are narrowed to f32 before formatting.
    pub fn with_narrow_floats(mut self, narrow_floats: bool) -> Self {
        self.narrow_floats = narrow_floats;
        self
    }

    /// Buffer one batch of rows, flushing if the threshold is reached.
    pub fn accumulate(&mut self, batch: Vec<WindowFeatureRow>) -> Result<()> {
        self.buffer.extend(batch);
        if self.buffer.len() >= self.chunk_size {
            self.flush_buffer()?;
        }
        Ok(())
    }

    /// Persist whatever remains in the buffer, even below the threshold.
    pub fn flush(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.flush_buffer()?;
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn buffered_rows(&self) -> usize {
        self.buffer.len()
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if self.writer.is_none() {
            let mut writer = csv::Writer::from_writer(File::create(&self.path)?);
            writer.write_record(&self.columns)?;
            self.writer = Some(writer);
        }
        let writer = self.writer.as_mut().unwrap();

        for row in self.buffer.drain(..) {
            let mut record = csv::StringRecord::with_capacity(64, self.columns.len());
            record.push_field(&row.date.to_string());
            record.push_field(&format_float(row.location.latitude, self.narrow_floats));
            record.push_field(&format_float(row.location.longitude, self.narrow_floats));
            for value in row.features.iter().chain(row.targets.iter()) {
                record.push_field(&format_float(*value, self.narrow_floats));
            }
            writer.write_record(&record)?;
            self.rows_written += 1;
        }
        writer.flush()?;

        debug!(rows = self.rows_written, path = %self.path.display(), "flushed feature chunk");
        Ok(())
    }
}
