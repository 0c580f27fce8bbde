// Artifact Store Port (window results, combined results, report)

use async_trait::async_trait;

use crate::domain::{OverallStatus, ValidationResult};
use crate::error::Result;

/// Durable storage for validation artifacts.
///
/// Window artifacts are the unit of idempotent progress: a persisted window
/// is reused on resume; an in-flight window that never reached `write_window`
/// is re-run from its start. Consumers (report generator, decision engine)
/// never mutate artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Whether window `index` was already persisted by a previous run
    async fn window_exists(&self, index: usize) -> Result<bool>;

    async fn load_window(&self, index: usize) -> Result<Vec<ValidationResult>>;

    async fn write_window(&self, index: usize, results: &[ValidationResult]) -> Result<()>;

    /// Concatenate windows 0..count into one combined artifact, remove the
    /// per-window intermediates, and return the combined location
    async fn combine_windows(&self, count: usize) -> Result<String>;

    async fn combined_exists(&self, location: &str) -> Result<bool>;

    async fn load_combined(&self, location: &str) -> Result<Vec<ValidationResult>>;

    /// Write the per-mailbox report consumed by operators; returns its location
    async fn write_report(&self, results: &[ValidationResult]) -> Result<String>;
}

/// Counts per classification, for progress logging and the final summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub ready: usize,
    pub warning: usize,
    pub failed: usize,
    pub unknown: usize,
}

impl StatusCounts {
    pub fn tally(results: &[ValidationResult]) -> Self {
        let mut counts = Self::default();
        for result in results {
            match result.overall_status {
                OverallStatus::Ready => counts.ready += 1,
                OverallStatus::Warning => counts.warning += 1,
                OverallStatus::Failed => counts.failed += 1,
                OverallStatus::Unknown => counts.unknown += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.ready + self.warning + self.failed + self.unknown
    }
}

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory artifact store for tests
    #[derive(Default)]
    pub struct MemoryArtifactStore {
        windows: Mutex<HashMap<usize, Vec<ValidationResult>>>,
        combined: Mutex<HashMap<String, Vec<ValidationResult>>>,
        reports: Mutex<Vec<String>>,
    }

    impl MemoryArtifactStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn window_count(&self) -> usize {
            self.windows.lock().unwrap().len()
        }

        pub fn report_count(&self) -> usize {
            self.reports.lock().unwrap().len()
        }

        /// Seed a combined artifact directly (for resume tests)
        pub fn seed_combined(&self, location: &str, results: Vec<ValidationResult>) {
            self.combined
                .lock()
                .unwrap()
                .insert(location.to_string(), results);
        }

        /// Seed a window artifact directly (for resume tests)
        pub fn seed_window(&self, index: usize, results: Vec<ValidationResult>) {
            self.windows.lock().unwrap().insert(index, results);
        }
    }

    #[async_trait]
    impl ArtifactStore for MemoryArtifactStore {
        async fn window_exists(&self, index: usize) -> Result<bool> {
            Ok(self.windows.lock().unwrap().contains_key(&index))
        }

        async fn load_window(&self, index: usize) -> Result<Vec<ValidationResult>> {
            self.windows
                .lock()
                .unwrap()
                .get(&index)
                .cloned()
                .ok_or_else(|| crate::AppError::NotFound(format!("window {}", index)))
        }

        async fn write_window(&self, index: usize, results: &[ValidationResult]) -> Result<()> {
            self.windows
                .lock()
                .unwrap()
                .insert(index, results.to_vec());
            Ok(())
        }

        async fn combine_windows(&self, count: usize) -> Result<String> {
            let mut all = Vec::new();
            let mut windows = self.windows.lock().unwrap();
            for index in 0..count {
                let window = windows.remove(&index).ok_or_else(|| {
                    crate::AppError::NotFound(format!("window {} during combine", index))
                })?;
                all.extend(window);
            }
            let location = "combined-results".to_string();
            self.combined.lock().unwrap().insert(location.clone(), all);
            Ok(location)
        }

        async fn combined_exists(&self, location: &str) -> Result<bool> {
            Ok(self.combined.lock().unwrap().contains_key(location))
        }

        async fn load_combined(&self, location: &str) -> Result<Vec<ValidationResult>> {
            self.combined
                .lock()
                .unwrap()
                .get(location)
                .cloned()
                .ok_or_else(|| crate::AppError::NotFound(format!("combined {}", location)))
        }

        async fn write_report(&self, results: &[ValidationResult]) -> Result<String> {
            let location = format!("report-{}", results.len());
            self.reports.lock().unwrap().push(location.clone());
            Ok(location)
        }
    }
}
