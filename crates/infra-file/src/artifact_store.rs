// File-backed artifact store: window results, combined results, CSV report

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use mailferry_core::domain::ValidationResult;
use mailferry_core::port::ArtifactStore;
use mailferry_core::{AppError, Result};

const COMBINED_FILE: &str = "combined-results.json";
const REPORT_FILE: &str = "validation-report.csv";

/// Stores validation artifacts under a working directory.
///
/// Window results land in `window-NNNN.json`, each written atomically via a
/// temp file and rename. `combine_windows` concatenates them into
/// `combined-results.json` and removes the per-window intermediates.
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn window_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("window-{:04}.json", index))
    }

    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let mut temp_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());
        temp_name.push_str(".tmp");
        let temp = path.with_file_name(temp_name);
        fs::write(&temp, bytes).await?;
        fs::rename(&temp, path).await?;
        Ok(())
    }

    async fn read_results(&self, path: &Path) -> Result<Vec<ValidationResult>> {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound(format!(
                    "artifact {}",
                    path.display()
                )))
            }
            Err(error) => return Err(error.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn window_exists(&self, index: usize) -> Result<bool> {
        Ok(self.window_path(index).exists())
    }

    async fn load_window(&self, index: usize) -> Result<Vec<ValidationResult>> {
        self.read_results(&self.window_path(index)).await
    }

    async fn write_window(&self, index: usize, results: &[ValidationResult]) -> Result<()> {
        let path = self.window_path(index);
        let serialized = serde_json::to_vec_pretty(results)?;
        self.write_atomic(&path, &serialized).await?;
        debug!(path = %path.display(), results = %results.len(), "Window artifact written");
        Ok(())
    }

    async fn combine_windows(&self, count: usize) -> Result<String> {
        let mut all = Vec::new();
        for index in 0..count {
            let mut window = self.load_window(index).await?;
            all.append(&mut window);
        }

        let combined = self.dir.join(COMBINED_FILE);
        let serialized = serde_json::to_vec_pretty(&all)?;
        self.write_atomic(&combined, &serialized).await?;

        // Intermediates go only after the combined artifact is durable
        for index in 0..count {
            let _ = fs::remove_file(self.window_path(index)).await;
        }

        info!(
            path = %combined.display(),
            results = %all.len(),
            windows = %count,
            "Combined artifact written"
        );
        Ok(combined.to_string_lossy().into_owned())
    }

    async fn combined_exists(&self, location: &str) -> Result<bool> {
        Ok(Path::new(location).exists())
    }

    async fn load_combined(&self, location: &str) -> Result<Vec<ValidationResult>> {
        self.read_results(Path::new(location)).await
    }

    async fn write_report(&self, results: &[ValidationResult]) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record([
                "Identity",
                "Status",
                "ItemCount",
                "TotalSizeMB",
                "Errors",
                "Warnings",
            ])
            .map_err(|e| AppError::Storage(format!("report row: {}", e)))?;

        for result in results {
            let errors = result
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            let warnings = result.warnings.join("; ");
            writer
                .write_record([
                    result.identity.as_str(),
                    &result.overall_status.to_string(),
                    &result.item_count.map(|c| c.to_string()).unwrap_or_default(),
                    &result
                        .total_size_mb
                        .map(|s| format!("{:.1}", s))
                        .unwrap_or_default(),
                    &errors,
                    &warnings,
                ])
                .map_err(|e| AppError::Storage(format!("report row: {}", e)))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::Storage(format!("report buffer: {}", e)))?;
        let path = self.dir.join(REPORT_FILE);
        self.write_atomic(&path, &bytes).await?;
        info!(path = %path.display(), rows = %results.len(), "Validation report written");
        Ok(path.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn result(identity: &str) -> ValidationResult {
        let mut r = ValidationResult::new(identity);
        r.item_count = Some(1200);
        r.total_size_mb = Some(256.5);
        r.finalize(1000);
        r
    }

    #[tokio::test]
    async fn test_window_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());

        assert!(!store.window_exists(0).await.unwrap());
        store
            .write_window(0, &[result("alice@contoso.com")])
            .await
            .unwrap();
        assert!(store.window_exists(0).await.unwrap());

        let loaded = store.load_window(0).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].identity, "alice@contoso.com");
        assert_eq!(loaded[0].item_count, Some(1200));
    }

    #[tokio::test]
    async fn test_combine_removes_intermediates_and_preserves_order() {
        let dir = tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());

        store
            .write_window(0, &[result("a@contoso.com"), result("b@contoso.com")])
            .await
            .unwrap();
        store
            .write_window(1, &[result("c@contoso.com")])
            .await
            .unwrap();

        let location = store.combine_windows(2).await.unwrap();
        assert!(store.combined_exists(&location).await.unwrap());
        assert!(!store.window_exists(0).await.unwrap());
        assert!(!store.window_exists(1).await.unwrap());

        let combined = store.load_combined(&location).await.unwrap();
        let identities: Vec<_> = combined.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(
            identities,
            vec!["a@contoso.com", "b@contoso.com", "c@contoso.com"]
        );
    }

    #[tokio::test]
    async fn test_combine_with_missing_window_fails() {
        let dir = tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());
        store.write_window(0, &[result("a@contoso.com")]).await.unwrap();

        let error = store.combine_windows(2).await.unwrap_err();
        assert!(matches!(error, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_report_contains_header_and_rows() {
        let dir = tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());

        let mut failed = ValidationResult::new("ghost@contoso.com");
        failed.add_error("MBX_NOT_FOUND", "mailbox not found");
        failed.finalize(1000);

        let location = store
            .write_report(&[result("alice@contoso.com"), failed])
            .await
            .unwrap();
        let raw = std::fs::read_to_string(&location).unwrap();
        let mut lines = raw.lines();
        assert!(lines.next().unwrap().starts_with("Identity,Status"));
        assert!(raw.contains("alice@contoso.com,READY"));
        assert!(raw.contains("MBX_NOT_FOUND"));
    }
}
