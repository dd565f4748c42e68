use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Counters collected while scanning an archive.
pub struct ScanMetrics {
    inner: Mutex<Metrics>,
}

/// Point-in-time copy of [`ScanMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metrics {
    pub files_scanned: usize,
    pub matches: usize,
    pub failed_files: Vec<PathBuf>,
}

impl ScanMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_scanned(&self, matches: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.files_scanned += 1;
            metrics.matches += matches;
        }
    }

    pub fn record_failure(&self, path: &Path) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.failed_files.push(path.to_path_buf());
        }
    }

    pub fn reset(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            *metrics = Metrics::default();
        }
    }

    pub fn snapshot(&self) -> Metrics {
        if let Ok(metrics) = self.inner.lock() {
            metrics.clone()
        } else {
            Metrics::default()
        }
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}
