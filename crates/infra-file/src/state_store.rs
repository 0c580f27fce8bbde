// File-backed run state store with atomic replacement

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use mailferry_core::domain::MigrationRunState;
use mailferry_core::port::RunStateStore;
use mailferry_core::{AppError, Result};

/// Persists the run state document as pretty-printed JSON.
///
/// Saves write to a sibling temp file and rename it over the target, so a
/// crash mid-write never leaves a truncated document. A document that fails
/// to parse is set aside (never deleted) and the run starts fresh.
pub struct FileRunStateStore {
    path: PathBuf,
}

impl FileRunStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "run-state.json".to_string());
        name.push_str(".tmp");
        self.path.with_file_name(name)
    }

    fn corrupt_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "run-state.json".to_string());
        name.push_str(&format!(".corrupt-{}", chrono::Utc::now().timestamp()));
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RunStateStore for FileRunStateStore {
    async fn load(&self) -> Result<Option<MigrationRunState>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No run state file");
                return Ok(None);
            }
            Err(error) => return Err(error.into()),
        };

        match serde_json::from_str::<MigrationRunState>(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(parse_error) => {
                let aside = self.corrupt_path();
                warn!(
                    path = %self.path.display(),
                    set_aside = %aside.display(),
                    error = %parse_error,
                    "Run state file is corrupted, setting it aside"
                );
                fs::rename(&self.path, &aside).await.map_err(|rename_error| {
                    AppError::Storage(format!(
                        "could not set aside corrupted state file {}: {}",
                        self.path.display(),
                        rename_error
                    ))
                })?;
                Ok(None)
            }
        }
    }

    async fn save(&self, state: &MigrationRunState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let serialized = serde_json::to_vec_pretty(state)?;
        let temp = self.temp_path();
        fs::write(&temp, &serialized).await?;
        fs::rename(&temp, &self.path).await?;
        debug!(
            path = %self.path.display(),
            stage = %state.current_stage,
            "Run state persisted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailferry_core::domain::RunStage;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileRunStateStore::new(dir.path().join("run-state.json"));

        let mut state = MigrationRunState::new("run-1", "wave-1", "input.csv", 1000);
        state.advance_to(RunStage::ValidatingMailboxes, 1001).unwrap();
        state.validation_results_location = Some("combined.json".into());
        store.save(&state).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.run_id, "run-1");
        assert_eq!(loaded.current_stage, RunStage::ValidatingMailboxes);
        assert_eq!(
            loaded.validation_results_location.as_deref(),
            Some("combined.json")
        );
    }

    #[tokio::test]
    async fn test_missing_file_loads_as_none() {
        let dir = tempdir().unwrap();
        let store = FileRunStateStore::new(dir.path().join("absent.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_set_aside_not_deleted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run-state.json");
        std::fs::write(&path, "{ not json at all").unwrap();

        let store = FileRunStateStore::new(&path);
        assert!(store.load().await.unwrap().is_none());
        assert!(!path.exists());

        // The original bytes survive under a .corrupt-* name
        let set_aside: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .contains(".corrupt-")
            })
            .collect();
        assert_eq!(set_aside.len(), 1);
    }

    #[tokio::test]
    async fn test_save_replaces_previous_document() {
        let dir = tempdir().unwrap();
        let store = FileRunStateStore::new(dir.path().join("run-state.json"));

        let mut state = MigrationRunState::new("run-1", "wave-1", "input.csv", 1000);
        store.save(&state).await.unwrap();
        state.advance_to(RunStage::Completed, 1001).unwrap();
        store.save(&state).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.current_stage, RunStage::Completed);
        // No stray temp file left behind
        assert!(!store.temp_path().exists());
    }
}
