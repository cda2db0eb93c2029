use rayon::prelude::*;
use std::path::PathBuf;

use crate::error::{PipelineError, Result};
use crate::models::DailyTable;
use crate::readers::DailyFeatureReader;

/// Fan-out loader for many per-period daily-feature files.
///
/// Parsing happens on a dedicated rayon pool inside a blocking task so the
/// async caller is never starved; result order matches input path order.
pub struct ConcurrentReader {
    max_workers: usize,
}

impl ConcurrentReader {
    pub fn new(max_workers: usize) -> Self {
        Self { max_workers }
    }

    pub async fn read_daily_feature_files(&self, paths: Vec<PathBuf>) -> Result<Vec<DailyTable>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let tables = tokio::task::spawn_blocking(move || {
            pool.install(|| {
                paths
                    .par_iter()
                    .map(|path| DailyFeatureReader::new().read(path))
                    .collect::<Result<Vec<DailyTable>>>()
            })
        })
        .await??;

        Ok(tables)
    }
}

impl Default for ConcurrentReader {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_reads_files_in_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();

        for (name, day) in [("a", 1), ("b", 2)] {
            let path = dir.path().join(format!("{}_daily_features.csv", name));
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "date,latitude,longitude,t2m_mean,t2m_mean_next").unwrap();
            writeln!(file, "2023-07-0{},10.0,20.0,18.0,19.0", day).unwrap();
            paths.push(path);
        }

        let tables = ConcurrentReader::new(2)
            .read_daily_feature_files(paths)
            .await
            .unwrap();

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].records[0].date.to_string(), "2023-07-01");
        assert_eq!(tables[1].records[0].date.to_string(), "2023-07-02");
    }
}
