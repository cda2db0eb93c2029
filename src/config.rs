use crate::error::{PipelineError, Result};
use crate::utils::constants::{DEFAULT_CHUNK_SAVE_SIZE, DEFAULT_WINDOW_SIZE, PREDICTED_VARIABLES};

/// Per-run configuration handed explicitly to every stage entry point.
///
/// Defaults mirror the compiled-in constants; CLI flags override only the
/// tuning knobs that are safe to vary between runs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of strictly-preceding daily records aggregated per feature row.
    pub window_size: usize,
    /// Buffered row count that triggers an incremental flush to disk.
    pub chunk_save_size: usize,
    /// Variables for which next-day targets are generated.
    pub predicted_variables: Vec<String>,
    /// Narrow f64 values to f32 storage width when persisting feature rows.
    pub narrow_floats: bool,
    /// Worker threads for per-file and per-location parallelism.
    pub max_workers: usize,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            chunk_save_size: DEFAULT_CHUNK_SAVE_SIZE,
            predicted_variables: PREDICTED_VARIABLES.iter().map(|v| v.to_string()).collect(),
            narrow_floats: true,
            max_workers: num_cpus::get(),
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_chunk_save_size(mut self, chunk_save_size: usize) -> Self {
        self.chunk_save_size = chunk_save_size;
        self
    }

    pub fn with_narrow_floats(mut self, narrow_floats: bool) -> Self {
        self.narrow_floats = narrow_floats;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(PipelineError::Config(
                "window size must be at least 1".to_string(),
            ));
        }
        if self.chunk_save_size == 0 {
            return Err(PipelineError::Config(
                "chunk save size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::new();
        assert_eq!(config.window_size, 7);
        assert_eq!(config.chunk_save_size, 10_000);
        assert_eq!(config.predicted_variables, vec!["t2m".to_string()]);
        assert!(config.narrow_floats);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_window() {
        let config = PipelineConfig::new().with_window_size(0);
        assert!(config.validate().is_err());
    }
}
